use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::cache::strategy::QueryType;

/// What the operator is asking for. `Unknown` is the zero-score outcome,
/// not an error.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    PasswordLookup,
    ConfigurationLookup,
    NetworkInfo,
    OrganizationInfo,
    ContactLookup,
    LocationLookup,
    DocumentSearch,
    AssetInventory,
    Troubleshooting,
    AuditReport,
    ChangeHistory,
    AccessRequest,
    BackupStatus,
    LicenseLookup,
    MonitoringStatus,
    GeneralSearch,
    Unknown,
}

impl QueryIntent {
    /// Downstream query-plan tag for this intent.
    #[must_use]
    pub fn strategy(&self) -> &'static str {
        match self {
            Self::PasswordLookup => "password_by_system",
            Self::ConfigurationLookup => "configuration_detail",
            Self::NetworkInfo => "network_topology",
            Self::OrganizationInfo => "organization_profile",
            Self::ContactLookup => "contact_directory",
            Self::LocationLookup => "location_directory",
            Self::DocumentSearch => "document_fulltext",
            Self::AssetInventory => "asset_inventory",
            Self::Troubleshooting => "incident_context",
            Self::AuditReport => "audit_trail",
            Self::ChangeHistory => "change_log",
            Self::AccessRequest => "access_grant",
            Self::BackupStatus => "backup_health",
            Self::LicenseLookup => "license_register",
            Self::MonitoringStatus => "monitoring_snapshot",
            Self::GeneralSearch | Self::Unknown => "fulltext_search",
        }
    }

    /// Cache policy class for queries of this intent.
    #[must_use]
    pub fn query_type(&self) -> QueryType {
        match self {
            Self::PasswordLookup | Self::AccessRequest | Self::MonitoringStatus => {
                QueryType::Critical
            }
            Self::Troubleshooting => QueryType::Investigation,
            Self::ConfigurationLookup | Self::NetworkInfo | Self::BackupStatus => {
                QueryType::Operational
            }
            Self::OrganizationInfo
            | Self::ContactLookup
            | Self::LocationLookup
            | Self::DocumentSearch => QueryType::Documentation,
            Self::AssetInventory
            | Self::AuditReport
            | Self::ChangeHistory
            | Self::LicenseLookup => QueryType::Report,
            Self::GeneralSearch | Self::Unknown => QueryType::Search,
        }
    }

    /// Operator-facing next steps. For `Unknown` these double as
    /// clarifying suggestions.
    #[must_use]
    pub fn suggested_actions(&self) -> Vec<String> {
        let actions: &[&str] = match self {
            Self::PasswordLookup => &[
                "verify requester authorization",
                "fetch the password entry",
                "record the access in the audit log",
            ],
            Self::ConfigurationLookup => &[
                "load the configuration record",
                "include related passwords and documents",
            ],
            Self::NetworkInfo => &[
                "resolve the network segment",
                "list attached devices and interfaces",
            ],
            Self::OrganizationInfo => &[
                "load the organization profile",
                "summarize linked configurations and contacts",
            ],
            Self::ContactLookup => &["search the contact directory"],
            Self::LocationLookup => &["search site and location records"],
            Self::DocumentSearch => &[
                "run a full-text document search",
                "rank by document freshness",
            ],
            Self::AssetInventory => &["enumerate matching assets", "group by asset type"],
            Self::Troubleshooting => &[
                "pull recent changes for the affected system",
                "fetch related configurations and credentials",
                "check monitoring and backup state",
            ],
            Self::AuditReport => &["collect audit trail entries", "build the requested report"],
            Self::ChangeHistory => &["list recent changes in scope"],
            Self::AccessRequest => &[
                "confirm approver and scope",
                "grant or stage the requested access",
            ],
            Self::BackupStatus => &["check last backup runs", "flag failed or stale jobs"],
            Self::LicenseLookup => &["look up license records", "report seats and expirations"],
            Self::MonitoringStatus => &["fetch current monitoring state"],
            Self::GeneralSearch => &["run a broad search across all record types"],
            Self::Unknown => &[
                "rephrase with a system or organization name",
                "name the record type you need (password, configuration, document)",
                "add context such as a site or time range",
            ],
        };
        actions.iter().map(|a| (*a).to_string()).collect()
    }
}

/// Classification of one query: the winning intent, how confidently it
/// won, and the runners-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentClassification {
    pub primary_intent: QueryIntent,
    /// Primary score over the sum of all group scores, in [0, 1].
    pub confidence: f64,
    /// Up to two runner-up intents with their normalized weights.
    pub secondary_intents: Vec<(QueryIntent, f64)>,
    pub strategy: String,
    pub matched_keywords: Vec<String>,
    pub suggested_actions: Vec<String>,
}

impl IntentClassification {
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            primary_intent: QueryIntent::Unknown,
            confidence: 0.0,
            secondary_intents: Vec::new(),
            strategy: QueryIntent::Unknown.strategy().to_string(),
            matched_keywords: Vec::new(),
            suggested_actions: QueryIntent::Unknown.suggested_actions(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_every_intent_has_strategy_and_actions() {
        for intent in QueryIntent::iter() {
            assert!(!intent.strategy().is_empty());
            assert!(!intent.suggested_actions().is_empty());
        }
    }

    #[test]
    fn test_intent_count() {
        assert_eq!(QueryIntent::iter().count(), 17);
    }

    #[test]
    fn test_query_type_mapping() {
        assert_eq!(QueryIntent::PasswordLookup.query_type(), QueryType::Critical);
        assert_eq!(QueryIntent::Troubleshooting.query_type(), QueryType::Investigation);
        assert_eq!(QueryIntent::DocumentSearch.query_type(), QueryType::Documentation);
        assert_eq!(QueryIntent::Unknown.query_type(), QueryType::Search);
    }
}
