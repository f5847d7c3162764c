use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Cache policy class for a query. Chosen from the classified intent,
/// never from the raw query text.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    Critical,
    Investigation,
    Operational,
    Documentation,
    Report,
    Search,
}

/// TTL and lifecycle policy for one query type. The table is static
/// configuration: loaded once, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStrategy {
    pub ttl_seconds: u64,
    pub warm_on_startup: bool,
    pub refresh_before_expiry: bool,
    pub invalidate_on_update: bool,
    pub max_entries: Option<usize>,
}

impl CacheStrategy {
    /// The policy table. Values are part of the crate contract and are
    /// asserted literally in tests.
    #[must_use]
    pub fn for_type(query_type: QueryType) -> Self {
        match query_type {
            QueryType::Critical => Self {
                ttl_seconds: 60,
                warm_on_startup: true,
                refresh_before_expiry: true,
                invalidate_on_update: true,
                max_entries: Some(100),
            },
            QueryType::Investigation => Self {
                ttl_seconds: 300,
                warm_on_startup: false,
                refresh_before_expiry: true,
                invalidate_on_update: true,
                max_entries: Some(500),
            },
            QueryType::Operational => Self {
                ttl_seconds: 900,
                warm_on_startup: true,
                refresh_before_expiry: false,
                invalidate_on_update: true,
                max_entries: Some(1000),
            },
            QueryType::Documentation => Self {
                ttl_seconds: 86400,
                warm_on_startup: true,
                refresh_before_expiry: false,
                invalidate_on_update: false,
                max_entries: Some(2000),
            },
            QueryType::Report => Self {
                ttl_seconds: 3600,
                warm_on_startup: false,
                refresh_before_expiry: false,
                invalidate_on_update: true,
                max_entries: Some(100),
            },
            QueryType::Search => Self {
                ttl_seconds: 600,
                warm_on_startup: false,
                refresh_before_expiry: false,
                invalidate_on_update: false,
                max_entries: Some(5000),
            },
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_table_reproduced_exactly() {
        let critical = CacheStrategy::for_type(QueryType::Critical);
        assert_eq!(critical.ttl_seconds, 60);
        assert!(critical.warm_on_startup);
        assert!(critical.refresh_before_expiry);
        assert!(critical.invalidate_on_update);
        assert_eq!(critical.max_entries, Some(100));

        let investigation = CacheStrategy::for_type(QueryType::Investigation);
        assert_eq!(investigation.ttl_seconds, 300);
        assert!(!investigation.warm_on_startup);
        assert!(investigation.refresh_before_expiry);
        assert!(investigation.invalidate_on_update);
        assert_eq!(investigation.max_entries, Some(500));

        let operational = CacheStrategy::for_type(QueryType::Operational);
        assert_eq!(operational.ttl_seconds, 900);
        assert!(operational.warm_on_startup);
        assert!(!operational.refresh_before_expiry);
        assert!(operational.invalidate_on_update);
        assert_eq!(operational.max_entries, Some(1000));

        let documentation = CacheStrategy::for_type(QueryType::Documentation);
        assert_eq!(documentation.ttl_seconds, 86400);
        assert!(documentation.warm_on_startup);
        assert!(!documentation.refresh_before_expiry);
        assert!(!documentation.invalidate_on_update);
        assert_eq!(documentation.max_entries, Some(2000));

        let report = CacheStrategy::for_type(QueryType::Report);
        assert_eq!(report.ttl_seconds, 3600);
        assert!(!report.warm_on_startup);
        assert!(!report.refresh_before_expiry);
        assert!(report.invalidate_on_update);
        assert_eq!(report.max_entries, Some(100));

        let search = CacheStrategy::for_type(QueryType::Search);
        assert_eq!(search.ttl_seconds, 600);
        assert!(!search.warm_on_startup);
        assert!(!search.refresh_before_expiry);
        assert!(!search.invalidate_on_update);
        assert_eq!(search.max_entries, Some(5000));
    }

    #[test]
    fn test_all_ttls_positive() {
        for query_type in QueryType::iter() {
            assert!(CacheStrategy::for_type(query_type).ttl_seconds > 0);
        }
    }

    #[test]
    fn test_query_type_parses_case_insensitively() {
        assert_eq!("CRITICAL".parse::<QueryType>().unwrap(), QueryType::Critical);
        assert_eq!("search".parse::<QueryType>().unwrap(), QueryType::Search);
    }
}
