use std::pin::Pin;

use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::core::error::Result;

use super::engine::CacheEngine;
use super::strategy::{CacheStrategy, QueryType};

pub type WarmFetch = Pin<Box<dyn Future<Output = Result<Value>> + Send>>;

/// One cache entry to prime at startup.
pub struct WarmupEntry {
    pub key: String,
    pub query_type: QueryType,
    pub tags: Vec<String>,
    pub fetch: WarmFetch,
}

impl WarmupEntry {
    #[must_use]
    pub fn new(key: impl Into<String>, query_type: QueryType, fetch: WarmFetch) -> Self {
        Self {
            key: key.into(),
            query_type,
            tags: Vec::new(),
            fetch,
        }
    }
}

/// Prime the cache for entries whose strategy has `warm_on_startup`.
///
/// Entries of other query types are skipped (and logged, so the skip is
/// visible). Failed fetches are logged and do not fail startup. Returns
/// the number of entries actually warmed.
pub async fn warm_startup(engine: &CacheEngine, entries: Vec<WarmupEntry>) -> usize {
    let (warmable, skipped): (Vec<_>, Vec<_>) = entries
        .into_iter()
        .partition(|e| CacheStrategy::for_type(e.query_type).warm_on_startup);

    for entry in &skipped {
        debug!(key = %entry.key, query_type = %entry.query_type, "strategy does not warm on startup, skipping");
    }

    let tasks = warmable.into_iter().map(|entry| async move {
        let result = engine
            .get_or_fetch_tagged(&entry.key, entry.query_type, false, &entry.tags, || {
                entry.fetch
            })
            .await;
        match result {
            Ok(_) => true,
            Err(err) => {
                warn!(key = %entry.key, error = %err, "cache warming fetch failed");
                false
            }
        }
    });

    let warmed = join_all(tasks).await.into_iter().filter(|ok| *ok).count();
    info!(warmed, "startup cache warming complete");
    warmed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::{CacheStore, MemoryStore};
    use crate::core::error::PipelineError;
    use serde_json::json;
    use std::sync::Arc;

    fn entry(key: &str, query_type: QueryType, value: Value) -> WarmupEntry {
        WarmupEntry::new(key, query_type, Box::pin(async move { Ok(value) }))
    }

    #[tokio::test]
    async fn test_warms_only_warmable_strategies() {
        let store = Arc::new(MemoryStore::new(100));
        let engine = CacheEngine::new(Arc::clone(&store) as Arc<dyn CacheStore>);

        let warmed = warm_startup(
            &engine,
            vec![
                entry("critical", QueryType::Critical, json!(1)),
                entry("docs", QueryType::Documentation, json!(2)),
                entry("search", QueryType::Search, json!(3)),
            ],
        )
        .await;

        assert_eq!(warmed, 2);
        assert!(store.contains("critical").await.unwrap());
        assert!(store.contains("docs").await.unwrap());
        assert!(!store.contains("search").await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_warm_does_not_fail_startup() {
        let engine = CacheEngine::new(Arc::new(MemoryStore::new(100)));
        let failing = WarmupEntry::new(
            "bad",
            QueryType::Critical,
            Box::pin(async { Err(PipelineError::Upstream("down".to_string())) }),
        );

        let warmed = warm_startup(
            &engine,
            vec![failing, entry("good", QueryType::Operational, json!(1))],
        )
        .await;
        assert_eq!(warmed, 1);
    }
}
