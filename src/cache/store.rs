use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

/// Errors from the key/value store layer. The engine treats
/// `Unavailable` as a cache miss; it never aborts a query.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Cache TTL must be positive")]
    InvalidTtl,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Key/value seam between the cache engine and its backing store.
///
/// `get` honors TTL; `get_stale` ignores it, which is what makes the
/// stale-fallback path possible. One trait, concrete backends selected
/// by configuration.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fresh read: `None` for missing or expired entries.
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Read ignoring expiry, for stale fallback after a failed fetch.
    async fn get_stale(&self, key: &str) -> Result<Option<Value>, StoreError>;

    async fn set(
        &self,
        key: &str,
        value: Value,
        ttl: Duration,
        tags: &[String],
    ) -> Result<(), StoreError>;

    /// Remove one entry; true when something was removed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Fresh existence check; does not touch hit/miss accounting.
    async fn contains(&self, key: &str) -> Result<bool, StoreError>;

    /// Keys matching a glob pattern (`*` and `?` wildcards).
    async fn scan(&self, pattern: &str) -> Result<Vec<String>, StoreError>;

    /// Keys registered under an invalidation tag.
    async fn tag_members(&self, tag: &str) -> Result<Vec<String>, StoreError>;
}

#[derive(Debug, Default, Clone)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
}

impl CacheStats {
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct StoredEntry {
    value: Value,
    stored_at: Instant,
    ttl: Duration,
    tags: Vec<String>,
}

impl StoredEntry {
    fn is_fresh(&self) -> bool {
        self.stored_at.elapsed() < self.ttl
    }
}

/// In-memory [`CacheStore`]: LRU-bounded, TTL-stamped, tag-indexed.
///
/// Expired entries stay resident until evicted by capacity pressure so
/// they remain readable through `get_stale`.
pub struct MemoryStore {
    entries: Mutex<LruCache<String, StoredEntry>>,
    tags: Mutex<HashMap<String, HashSet<String>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryStore {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            tags: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size: self.entries.lock().len(),
        }
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
        self.tags.lock().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    fn untag(&self, key: &str) {
        let mut tags = self.tags.lock();
        tags.retain(|_, members| {
            members.remove(key);
            !members.is_empty()
        });
    }
}

fn glob_to_regex(pattern: &str) -> Option<Regex> {
    let escaped = regex::escape(pattern).replace(r"\*", ".*").replace(r"\?", ".");
    Regex::new(&format!("^{escaped}$")).ok()
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get(key) {
            if entry.is_fresh() {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Some(entry.value.clone()));
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        Ok(None)
    }

    async fn get_stale(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let mut entries = self.entries.lock();
        Ok(entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn set(
        &self,
        key: &str,
        value: Value,
        ttl: Duration,
        tags: &[String],
    ) -> Result<(), StoreError> {
        if ttl.is_zero() {
            return Err(StoreError::InvalidTtl);
        }

        let entry = StoredEntry {
            value,
            stored_at: Instant::now(),
            ttl,
            tags: tags.to_vec(),
        };

        let evicted = self.entries.lock().push(key.to_string(), entry);
        if let Some((evicted_key, _)) = evicted {
            if evicted_key != key {
                self.untag(&evicted_key);
            }
        }

        let mut tag_index = self.tags.lock();
        for tag in tags {
            tag_index
                .entry(tag.clone())
                .or_default()
                .insert(key.to_string());
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let removed = self.entries.lock().pop(key);
        if removed.is_some() {
            self.untag(key);
        }
        Ok(removed.is_some())
    }

    async fn contains(&self, key: &str) -> Result<bool, StoreError> {
        let entries = self.entries.lock();
        Ok(entries.peek(key).is_some_and(StoredEntry::is_fresh))
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let Some(regex) = glob_to_regex(pattern) else {
            return Ok(Vec::new());
        };
        let entries = self.entries.lock();
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(key, _)| regex.is_match(key))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn tag_members(&self, tag: &str) -> Result<Vec<String>, StoreError> {
        let tags = self.tags.lock();
        let mut members: Vec<String> = tags
            .get(tag)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        members.sort();
        Ok(members)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_get_roundtrip() {
        let store = MemoryStore::new(10);
        store
            .set("k1", json!({"a": 1}), Duration::from_secs(60), &[])
            .await
            .unwrap();
        assert_eq!(store.get("k1").await.unwrap(), Some(json!({"a": 1})));
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_entry_is_miss_but_stale_readable() {
        let store = MemoryStore::new(10);
        store
            .set("k1", json!("v"), Duration::from_millis(10), &[])
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(store.get("k1").await.unwrap(), None);
        assert_eq!(store.get_stale("k1").await.unwrap(), Some(json!("v")));
        assert!(!store.contains("k1").await.unwrap());
    }

    #[tokio::test]
    async fn test_zero_ttl_rejected() {
        let store = MemoryStore::new(10);
        let err = store
            .set("k1", json!("v"), Duration::ZERO, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidTtl));
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryStore::new(10);
        store
            .set("k1", json!("v"), Duration::from_secs(60), &[])
            .await
            .unwrap();
        assert!(store.delete("k1").await.unwrap());
        assert!(!store.delete("k1").await.unwrap());
    }

    #[tokio::test]
    async fn test_scan_glob() {
        let store = MemoryStore::new(10);
        for key in ["query:org1:a", "query:org1:b", "query:org2:a"] {
            store
                .set(key, json!(1), Duration::from_secs(60), &[])
                .await
                .unwrap();
        }
        let matched = store.scan("query:org1:*").await.unwrap();
        assert_eq!(matched, vec!["query:org1:a", "query:org1:b"]);
        assert!(store.scan("nothing:*").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tag_index_tracks_deletes() {
        let store = MemoryStore::new(10);
        store
            .set("k1", json!(1), Duration::from_secs(60), &["org:1".to_string()])
            .await
            .unwrap();
        store
            .set("k2", json!(2), Duration::from_secs(60), &["org:1".to_string()])
            .await
            .unwrap();

        assert_eq!(store.tag_members("org:1").await.unwrap(), vec!["k1", "k2"]);

        store.delete("k1").await.unwrap();
        assert_eq!(store.tag_members("org:1").await.unwrap(), vec!["k2"]);
        assert!(store.tag_members("unknown").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_eviction_cleans_tag_index() {
        let store = MemoryStore::new(2);
        for (key, tag) in [("k1", "t1"), ("k2", "t2"), ("k3", "t3")] {
            store
                .set(key, json!(1), Duration::from_secs(60), &[tag.to_string()])
                .await
                .unwrap();
        }
        // k1 was evicted by capacity.
        assert!(store.tag_members("t1").await.unwrap().is_empty());
        assert_eq!(store.stats().size, 2);
    }

    #[tokio::test]
    async fn test_stats_hit_rate() {
        let store = MemoryStore::new(10);
        store
            .set("k1", json!(1), Duration::from_secs(60), &[])
            .await
            .unwrap();
        store.get("k1").await.unwrap();
        store.get("k1").await.unwrap();
        store.get("missing").await.unwrap();

        let stats = store.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 2.0 / 3.0).abs() < 1e-9);
    }
}
