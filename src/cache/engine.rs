use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::core::error::{PipelineError, Result};

use super::store::CacheStore;
use super::strategy::{CacheStrategy, QueryType};

/// Per-request identity folded into cache keys so tenants never share
/// entries.
#[derive(Debug, Clone, Default)]
pub struct CacheContext {
    pub organization_id: Option<String>,
    pub user_id: Option<String>,
}

/// Emitted by a pre-expiry timer. The engine only signals; re-fetching
/// is the subscriber's job, keeping policy separate from data access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshSignal {
    pub key: String,
    pub query_type: QueryType,
}

/// Result of [`CacheEngine::get_or_fetch`].
#[derive(Debug, Clone)]
pub struct Fetched {
    pub value: Value,
    /// True when the fresh fetch failed and an expired entry was served
    /// instead.
    pub served_stale: bool,
}

const REFRESH_CHANNEL_CAPACITY: usize = 64;

/// Policy-driven cache front: deterministic keys, TTL selection by query
/// type, stale fallback on upstream failure, tag/pattern invalidation
/// and pre-expiry refresh signaling.
///
/// Store failures degrade to cache misses; the cache is a performance
/// layer, never a correctness dependency.
pub struct CacheEngine {
    store: Arc<dyn CacheStore>,
    refresh_factor: f64,
    refresh_tx: mpsc::Sender<RefreshSignal>,
    refresh_rx: Mutex<Option<mpsc::Receiver<RefreshSignal>>>,
    timers: Mutex<Vec<JoinHandle<()>>>,
}

impl CacheEngine {
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self::with_refresh_factor(store, crate::DEFAULT_REFRESH_FACTOR)
    }

    #[must_use]
    pub fn with_refresh_factor(store: Arc<dyn CacheStore>, refresh_factor: f64) -> Self {
        let (refresh_tx, refresh_rx) = mpsc::channel(REFRESH_CHANNEL_CAPACITY);
        Self {
            store,
            refresh_factor: refresh_factor.clamp(0.1, 1.0),
            refresh_tx,
            refresh_rx: Mutex::new(Some(refresh_rx)),
            timers: Mutex::new(Vec::new()),
        }
    }

    /// Take the refresh-signal receiver. Yields `Some` once; the owning
    /// orchestrator subscribes at startup.
    pub fn take_refresh_signals(&self) -> Option<mpsc::Receiver<RefreshSignal>> {
        self.refresh_rx.lock().take()
    }

    /// Deterministic cache key for a query, its parameters and the
    /// caller's identity. Parameters are sorted by name first, so the
    /// key is independent of map insertion order.
    #[must_use]
    pub fn key_for(query: &str, params: &HashMap<String, Value>, context: &CacheContext) -> String {
        let mut sorted: Vec<(&String, &Value)> = params.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));

        let mut hasher = Sha256::new();
        hasher.update(query.as_bytes());
        for (name, value) in sorted {
            hasher.update(b"|");
            hasher.update(name.as_bytes());
            hasher.update(b"=");
            hasher.update(value.to_string().as_bytes());
        }
        if let Some(org) = &context.organization_id {
            hasher.update(b"|org:");
            hasher.update(org.as_bytes());
        }
        if let Some(user) = &context.user_id {
            hasher.update(b"|user:");
            hasher.update(user.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }

    /// Cached read with fetch-on-miss and stale fallback.
    ///
    /// `fetch` runs at most once per call: on a fetch error the engine
    /// tries one stale read and never retries the fetch, even under
    /// `force_refresh`. The entry is written only after a successful
    /// fetch, so a cancelled fetch leaves nothing behind. There is no
    /// single-flight guard: concurrent calls for the same cold key may
    /// each invoke their own fetch.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &str,
        query_type: QueryType,
        force_refresh: bool,
        fetch: F,
    ) -> Result<Fetched>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        self.get_or_fetch_tagged(key, query_type, force_refresh, &[], fetch)
            .await
    }

    /// [`Self::get_or_fetch`] with extra invalidation tags registered on
    /// the written entry. The query type is always tagged.
    pub async fn get_or_fetch_tagged<F, Fut>(
        &self,
        key: &str,
        query_type: QueryType,
        force_refresh: bool,
        tags: &[String],
        fetch: F,
    ) -> Result<Fetched>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        if !force_refresh {
            match self.store.get(key).await {
                Ok(Some(value)) => {
                    debug!(key = %key, "cache hit");
                    return Ok(Fetched {
                        value,
                        served_stale: false,
                    });
                }
                Ok(None) => {}
                Err(err) => warn!(key = %key, error = %err, "cache read failed, treating as miss"),
            }
        }

        match fetch().await {
            Ok(value) => {
                let strategy = CacheStrategy::for_type(query_type);
                let mut all_tags = Vec::with_capacity(tags.len() + 1);
                all_tags.push(format!("type:{query_type}"));
                all_tags.extend_from_slice(tags);

                if let Err(err) = self
                    .store
                    .set(key, value.clone(), strategy.ttl(), &all_tags)
                    .await
                {
                    warn!(key = %key, error = %err, "cache write failed, serving uncached");
                }
                Ok(Fetched {
                    value,
                    served_stale: false,
                })
            }
            Err(err) => match self.store.get_stale(key).await {
                Ok(Some(value)) => {
                    warn!(key = %key, error = %err, "fetch failed, serving stale entry");
                    Ok(Fetched {
                        value,
                        served_stale: true,
                    })
                }
                _ => Err(match err {
                    upstream @ PipelineError::Upstream(_) => upstream,
                    other => PipelineError::Upstream(other.to_string()),
                }),
            },
        }
    }

    /// Drop every entry registered under any of the given tags. Missing
    /// tags are not an error; the count of removed entries is returned.
    pub async fn invalidate_by_tags(&self, tags: &[String]) -> usize {
        let mut removed = 0;
        for tag in tags {
            let members = match self.store.tag_members(tag).await {
                Ok(members) => members,
                Err(err) => {
                    warn!(tag = %tag, error = %err, "tag lookup failed during invalidation");
                    continue;
                }
            };
            for key in members {
                match self.store.delete(&key).await {
                    Ok(true) => removed += 1,
                    Ok(false) => {}
                    Err(err) => warn!(key = %key, error = %err, "delete failed during invalidation"),
                }
            }
        }
        debug!(removed, "tag invalidation complete");
        removed
    }

    /// Drop every entry whose key matches a glob pattern. Returns the
    /// count of removed entries; an unmatched pattern removes nothing.
    pub async fn invalidate_pattern(&self, pattern: &str) -> usize {
        let keys = match self.store.scan(pattern).await {
            Ok(keys) => keys,
            Err(err) => {
                warn!(pattern, error = %err, "scan failed during invalidation");
                return 0;
            }
        };

        let mut removed = 0;
        for key in keys {
            match self.store.delete(&key).await {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(err) => warn!(key = %key, error = %err, "delete failed during invalidation"),
            }
        }
        removed
    }

    /// Arm a one-shot pre-expiry timer for `key` when the query type's
    /// strategy asks for refresh-before-expiry. At `refresh_factor ×
    /// ttl` the timer checks that the key still exists and emits a
    /// [`RefreshSignal`]; it never re-fetches. Returns whether a timer
    /// was armed.
    pub fn schedule_refresh(
        &self,
        key: &str,
        query_type: QueryType,
        ttl: Duration,
    ) -> Result<bool> {
        if ttl.is_zero() {
            return Err(PipelineError::Validation(
                "refresh TTL must be positive".to_string(),
            ));
        }
        if !CacheStrategy::for_type(query_type).refresh_before_expiry {
            return Ok(false);
        }

        let delay = ttl.mul_f64(self.refresh_factor);
        let store = Arc::clone(&self.store);
        let sender = self.refresh_tx.clone();
        let key = key.to_string();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match store.contains(&key).await {
                Ok(true) => {
                    let _ = sender.send(RefreshSignal { key, query_type }).await;
                }
                Ok(false) => debug!(key = %key, "entry gone before refresh window"),
                Err(err) => warn!(key = %key, error = %err, "existence check failed in refresh timer"),
            }
        });

        let mut timers = self.timers.lock();
        timers.retain(|t| !t.is_finished());
        timers.push(handle);
        Ok(true)
    }

    /// Abort outstanding refresh timers. Called on shutdown so spawned
    /// timers never outlive the engine's owner.
    pub fn shutdown(&self) {
        for timer in self.timers.lock().drain(..) {
            timer.abort();
        }
    }
}

impl Drop for CacheEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::{MemoryStore, StoreError};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn engine() -> CacheEngine {
        CacheEngine::new(Arc::new(MemoryStore::new(100)))
    }

    #[test]
    fn test_key_for_is_order_independent() {
        let mut a = HashMap::new();
        a.insert("org".to_string(), json!("contoso"));
        a.insert("limit".to_string(), json!(10));
        a.insert("types".to_string(), json!(["password", "config"]));

        let mut b = HashMap::new();
        b.insert("types".to_string(), json!(["password", "config"]));
        b.insert("limit".to_string(), json!(10));
        b.insert("org".to_string(), json!("contoso"));

        let context = CacheContext {
            organization_id: Some("42".to_string()),
            user_id: Some("u7".to_string()),
        };

        assert_eq!(
            CacheEngine::key_for("admin password", &a, &context),
            CacheEngine::key_for("admin password", &b, &context),
        );
    }

    #[test]
    fn test_key_for_separates_tenants() {
        let params = HashMap::new();
        let org_a = CacheContext {
            organization_id: Some("a".to_string()),
            user_id: None,
        };
        let org_b = CacheContext {
            organization_id: Some("b".to_string()),
            user_id: None,
        };
        assert_ne!(
            CacheEngine::key_for("q", &params, &org_a),
            CacheEngine::key_for("q", &params, &org_b),
        );
    }

    #[tokio::test]
    async fn test_cold_key_fetches_once_then_hits() {
        let engine = engine();
        let calls = AtomicUsize::new(0);

        let fetched = engine
            .get_or_fetch("k", QueryType::Search, false, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(json!({"rows": 3}))
            })
            .await
            .unwrap();
        assert!(!fetched.served_stale);
        assert_eq!(fetched.value, json!({"rows": 3}));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let again = engine
            .get_or_fetch("k", QueryType::Search, false, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(json!({"rows": 99}))
            })
            .await
            .unwrap();
        assert_eq!(again.value, json!({"rows": 3}));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_error_serves_stale_without_retry() {
        let store = Arc::new(MemoryStore::new(100));
        store
            .set("k", json!("old"), Duration::from_millis(10), &[])
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        let engine = CacheEngine::new(store);
        let calls = AtomicUsize::new(0);
        let fetched = engine
            .get_or_fetch("k", QueryType::Critical, false, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(PipelineError::Upstream("rate limited".to_string()))
            })
            .await
            .unwrap();

        assert!(fetched.served_stale);
        assert_eq!(fetched.value, json!("old"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_force_refresh_error_still_falls_back_to_stale() {
        let engine = engine();
        engine
            .get_or_fetch("k", QueryType::Search, false, || async { Ok(json!("v1")) })
            .await
            .unwrap();

        let fetched = engine
            .get_or_fetch("k", QueryType::Search, true, || async {
                Err(PipelineError::Upstream("boom".to_string()))
            })
            .await
            .unwrap();
        assert!(fetched.served_stale);
        assert_eq!(fetched.value, json!("v1"));
    }

    #[tokio::test]
    async fn test_fetch_error_without_cache_propagates() {
        let engine = engine();
        let err = engine
            .get_or_fetch("cold", QueryType::Search, false, || async {
                Err(PipelineError::Upstream("no upstream".to_string()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_concurrent_cold_fetches_are_not_deduplicated() {
        let engine = Arc::new(engine());
        let calls = Arc::new(AtomicUsize::new(0));

        let fetch = |calls: Arc<AtomicUsize>| async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(json!(1))
        };

        let (a, b) = tokio::join!(
            engine.get_or_fetch("k", QueryType::Search, false, || fetch(Arc::clone(&calls))),
            engine.get_or_fetch("k", QueryType::Search, false, || fetch(Arc::clone(&calls))),
        );
        a.unwrap();
        b.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_by_tags() {
        let engine = engine();
        let tags = vec!["org:1".to_string()];
        for key in ["a", "b"] {
            engine
                .get_or_fetch_tagged(key, QueryType::Search, false, &tags, || async {
                    Ok(json!(key))
                })
                .await
                .unwrap();
        }

        assert_eq!(engine.invalidate_by_tags(&tags).await, 2);
        assert_eq!(engine.invalidate_by_tags(&tags).await, 0);
        assert_eq!(
            engine
                .invalidate_by_tags(&["never-registered".to_string()])
                .await,
            0
        );
    }

    #[tokio::test]
    async fn test_invalidate_by_query_type_tag() {
        let engine = engine();
        engine
            .get_or_fetch("k", QueryType::Report, false, || async { Ok(json!(1)) })
            .await
            .unwrap();
        assert_eq!(engine.invalidate_by_tags(&["type:report".to_string()]).await, 1);
    }

    #[tokio::test]
    async fn test_invalidate_pattern() {
        let engine = engine();
        for key in ["org:1:pw", "org:1:cfg", "org:2:pw"] {
            engine
                .get_or_fetch(key, QueryType::Search, false, || async { Ok(json!(1)) })
                .await
                .unwrap();
        }

        assert_eq!(engine.invalidate_pattern("org:1:*").await, 2);
        assert_eq!(engine.invalidate_pattern("org:1:*").await, 0);
        assert_eq!(engine.invalidate_pattern("no-such:*").await, 0);
    }

    #[tokio::test]
    async fn test_schedule_refresh_emits_signal() {
        let engine = engine();
        let mut signals = engine.take_refresh_signals().unwrap();

        engine
            .get_or_fetch("k", QueryType::Critical, false, || async { Ok(json!(1)) })
            .await
            .unwrap();
        let armed = engine
            .schedule_refresh("k", QueryType::Critical, Duration::from_millis(50))
            .unwrap();
        assert!(armed);

        let signal = tokio::time::timeout(Duration::from_millis(500), signals.recv())
            .await
            .expect("timer should fire")
            .expect("channel open");
        assert_eq!(signal.key, "k");
        assert_eq!(signal.query_type, QueryType::Critical);
    }

    #[tokio::test]
    async fn test_schedule_refresh_respects_strategy() {
        let engine = engine();
        // Operational strategy has refresh_before_expiry = false.
        let armed = engine
            .schedule_refresh("k", QueryType::Operational, Duration::from_millis(50))
            .unwrap();
        assert!(!armed);

        let err = engine
            .schedule_refresh("k", QueryType::Critical, Duration::ZERO)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    struct FailingStore;

    #[async_trait]
    impl CacheStore for FailingStore {
        async fn get(&self, _: &str) -> std::result::Result<Option<Value>, StoreError> {
            Err(StoreError::Unavailable("redis down".to_string()))
        }
        async fn get_stale(&self, _: &str) -> std::result::Result<Option<Value>, StoreError> {
            Err(StoreError::Unavailable("redis down".to_string()))
        }
        async fn set(
            &self,
            _: &str,
            _: Value,
            _: Duration,
            _: &[String],
        ) -> std::result::Result<(), StoreError> {
            Err(StoreError::Unavailable("redis down".to_string()))
        }
        async fn delete(&self, _: &str) -> std::result::Result<bool, StoreError> {
            Err(StoreError::Unavailable("redis down".to_string()))
        }
        async fn contains(&self, _: &str) -> std::result::Result<bool, StoreError> {
            Err(StoreError::Unavailable("redis down".to_string()))
        }
        async fn scan(&self, _: &str) -> std::result::Result<Vec<String>, StoreError> {
            Err(StoreError::Unavailable("redis down".to_string()))
        }
        async fn tag_members(&self, _: &str) -> std::result::Result<Vec<String>, StoreError> {
            Err(StoreError::Unavailable("redis down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_unavailable_store_degrades_to_miss() {
        let engine = CacheEngine::new(Arc::new(FailingStore));
        let fetched = engine
            .get_or_fetch("k", QueryType::Search, false, || async { Ok(json!("live")) })
            .await
            .unwrap();
        assert!(!fetched.served_stale);
        assert_eq!(fetched.value, json!("live"));

        assert_eq!(engine.invalidate_pattern("*").await, 0);
        assert_eq!(engine.invalidate_by_tags(&["t".to_string()]).await, 0);
    }
}
