//! In-memory response store.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::time::Instant;

/// A cached response payload and the moment it was stored.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub value: Value,
    pub stored_at: Instant,
}

impl CacheEntry {
    fn new(value: Value) -> Self {
        Self {
            value,
            stored_at: Instant::now(),
        }
    }

    pub fn age(&self) -> Duration {
        self.stored_at.elapsed()
    }

    /// Fresh while strictly younger than `ttl`.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.age() < ttl
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub invalidations: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Default)]
struct AtomicStats {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    invalidations: AtomicU64,
}

impl AtomicStats {
    fn to_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }
}

/// Response cache keyed by request URL.
///
/// Staleness is never enforced here: `get` returns entries regardless of age
/// and callers judge freshness against their own expiration time. Entries
/// leave the store only when overwritten or invalidated.
///
/// Cloning yields another handle to the same store.
#[derive(Clone, Default)]
pub struct CacheStore {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    stats: Arc<AtomicStats>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave a half-written map behind:
    // every critical section is a single HashMap call.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        self.read().get(key).cloned()
    }

    /// The cached value for `key` if it is younger than `ttl`.
    ///
    /// Stale entries are left in place. Counts towards hit/miss statistics.
    pub fn get_fresh(&self, key: &str, ttl: Duration) -> Option<Value> {
        let fresh = self
            .get(key)
            .filter(|e| e.is_fresh(ttl))
            .map(|e| e.value);
        let counter = if fresh.is_some() {
            &self.stats.hits
        } else {
            &self.stats.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        fresh
    }

    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.write().insert(key.into(), CacheEntry::new(value));
        self.stats.sets.fetch_add(1, Ordering::Relaxed);
    }

    /// Remove `key`, or every entry when `key` is `None`. Returns how many
    /// entries were removed.
    pub fn invalidate(&self, key: Option<&str>) -> usize {
        let removed = match key {
            Some(k) => usize::from(self.write().remove(k).is_some()),
            None => {
                let mut entries = self.write();
                let n = entries.len();
                entries.clear();
                n
            }
        };
        self.stats
            .invalidations
            .fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    pub fn contains(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Copy of the raw mapping, stale entries included.
    pub fn snapshot(&self) -> HashMap<String, CacheEntry> {
        self.read().clone()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.to_stats()
    }
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("len", &self.len())
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_then_get_returns_value() {
        let store = CacheStore::new();
        store.set("https://api.test/a", json!({"a": 1}));
        let entry = store.get("https://api.test/a").unwrap();
        assert_eq!(entry.value, json!({"a": 1}));
        assert!(store.get("https://api.test/b").is_none());
    }

    #[test]
    fn test_set_overwrites_existing_entry() {
        let store = CacheStore::new();
        store.set("k", json!(1));
        store.set("k", json!(2));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("k").unwrap().value, json!(2));
        assert_eq!(store.stats().sets, 2);
    }

    #[test]
    fn test_invalidate_single_key_leaves_others() {
        let store = CacheStore::new();
        store.set("a", json!("a"));
        store.set("b", json!("b"));
        assert_eq!(store.invalidate(Some("a")), 1);
        assert!(!store.contains("a"));
        assert!(store.contains("b"));
        assert_eq!(store.invalidate(Some("missing")), 0);
    }

    #[test]
    fn test_invalidate_all_clears_store() {
        let store = CacheStore::new();
        store.set("a", json!("a"));
        store.set("b", json!("b"));
        assert_eq!(store.invalidate(None), 2);
        assert!(store.is_empty());
        assert_eq!(store.stats().invalidations, 2);
    }

    #[test]
    fn test_clones_share_entries() {
        let store = CacheStore::new();
        let handle = store.clone();
        handle.set("shared", json!(true));
        assert!(store.contains("shared"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_freshness_is_judged_lazily() {
        let store = CacheStore::new();
        let ttl = Duration::from_millis(100);
        store.set("k", json!("v"));

        tokio::time::advance(Duration::from_millis(99)).await;
        assert_eq!(store.get_fresh("k", ttl), Some(json!("v")));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(store.get_fresh("k", ttl), None);

        // Stale entries stay until overwritten or invalidated.
        let entry = store.get("k").unwrap();
        assert_eq!(entry.age(), ttl);
        assert_eq!(store.len(), 1);

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_ratio(), 0.5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ttl_is_never_fresh() {
        let store = CacheStore::new();
        store.set("k", json!(0));
        assert_eq!(store.get_fresh("k", Duration::ZERO), None);
    }
}
