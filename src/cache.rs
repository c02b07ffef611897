//! Small time-bounded cache.
//!
//! [`TtlCache`] maps a key to a value plus an expiry instant. Lookups go
//! through [`TtlCache::get_or_fetch`], which returns the cached value while it
//! is fresh and otherwise runs the supplied fetcher and stores its result.
//! Fetch errors are returned to the caller and never cached.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Key → value cache where every entry carries its own expiry.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
}

impl<K, V> Default for TtlCache<K, V> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the fresh cached value for `key`, if any.
    pub fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone())
    }

    pub fn insert(&self, key: K, value: V, ttl: Duration) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Returns the cached value for `key`, or runs `fetch` and caches its
    /// result for `ttl`.
    ///
    /// The lock is not held while `fetch` runs, so two concurrent misses on
    /// the same key may both fetch; the later insert wins. Expired entries
    /// for other keys are dropped whenever a fetched value is stored.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: K, ttl: Duration, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }

        let value = fetch().await?;
        self.purge_expired();
        self.insert(key, value.clone(), ttl);
        Ok(value)
    }

    pub fn invalidate(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key).map(|entry| entry.value)
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Drops expired entries and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    /// Number of stored entries, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    const TTL: Duration = Duration::from_secs(30);

    #[tokio::test(start_paused = true)]
    async fn fresh_entry_is_served_without_fetching() {
        let cache: TtlCache<String, u32> = TtlCache::new();
        let calls = Cell::new(0);

        for _ in 0..3 {
            let v = cache
                .get_or_fetch("folder-a".to_string(), TTL, || async {
                    calls.set(calls.get() + 1);
                    Ok::<_, ()>(7)
                })
                .await
                .unwrap();
            assert_eq!(v, 7);
        }
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_is_refetched() {
        let cache: TtlCache<&str, u32> = TtlCache::new();
        cache.insert("k", 1, TTL);

        tokio::time::advance(TTL + Duration::from_millis(1)).await;
        assert_eq!(cache.get(&"k"), None);

        let v = cache
            .get_or_fetch("k", TTL, || async { Ok::<_, ()>(2) })
            .await
            .unwrap();
        assert_eq!(v, 2);
    }

    #[tokio::test]
    async fn fetch_errors_are_not_cached() {
        let cache: TtlCache<&str, u32> = TtlCache::new();

        let err = cache
            .get_or_fetch("k", TTL, || async { Err::<u32, _>("backend down") })
            .await;
        assert_eq!(err, Err("backend down"));
        assert!(cache.is_empty());

        let ok = cache
            .get_or_fetch("k", TTL, || async { Ok::<_, &str>(3) })
            .await;
        assert_eq!(ok, Ok(3));
    }

    #[test]
    fn invalidate_and_clear() {
        let cache: TtlCache<&str, u32> = TtlCache::new();
        cache.insert("a", 1, TTL);
        cache.insert("b", 2, TTL);

        assert_eq!(cache.invalidate(&"a"), Some(1));
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn purge_drops_only_expired_entries() {
        let cache: TtlCache<&str, u32> = TtlCache::new();
        cache.insert("short", 1, Duration::from_secs(1));
        cache.insert("long", 2, Duration::from_secs(60));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.get(&"long"), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn storing_a_fetch_drops_stale_entries() {
        let cache: TtlCache<&str, u32> = TtlCache::new();
        cache.insert("old-folder", 1, Duration::from_secs(1));
        cache.insert("live-folder", 2, TTL);

        tokio::time::advance(Duration::from_secs(2)).await;
        cache
            .get_or_fetch("new-folder", TTL, || async { Ok::<_, ()>(3) })
            .await
            .unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"live-folder"), Some(2));
        assert_eq!(cache.get(&"new-folder"), Some(3));
    }
}
