use std::time::Duration;

use tokio::time::Instant;

use crate::types::{CacheEntry, CacheKey};

/// Default maximum number of cached payloads.
const DEFAULT_MAX_ENTRIES: u64 = 1_000;

/// Default deduplication window for concurrent identical requests.
pub(crate) const DEFAULT_DEDUP_WINDOW: Duration = Duration::from_millis(2_000);

/// Configuration for the read-path cache.
///
/// ```rust
/// # use munin::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(200)
///     .dedup_window(Duration::from_millis(500));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached payloads. Default: 1,000.
    pub max_entries: u64,
    /// How long concurrent callers keep attaching to an in-flight fetch
    /// for the same key. Default: 2 seconds.
    pub dedup_window: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            dedup_window: DEFAULT_DEDUP_WINDOW,
        }
    }
}

impl CacheConfig {
    /// Create a config with the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached payloads.
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the deduplication window.
    pub fn dedup_window(mut self, window: Duration) -> Self {
        self.dedup_window = window;
        self
    }
}

/// Bounded in-memory store for cached payloads.
///
/// Backed by a moka LRU cache so a long-lived session cannot grow it
/// without bound. Deliberately configured with **no** time-based eviction:
/// each entry carries its own `expires_at`, and expired entries must stay
/// resident so the stale-on-error fallback can serve them.
pub struct CacheEntryStore {
    entries: moka::sync::Cache<CacheKey, CacheEntry>,
}

impl CacheEntryStore {
    /// Create an empty store holding at most `max_entries` payloads.
    pub fn new(max_entries: u64) -> Self {
        Self {
            entries: moka::sync::Cache::new(max_entries),
        }
    }

    /// Look up the entry for a key, fresh or stale.
    ///
    /// Returns `None` on cache miss.
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.get(key)
    }

    /// Insert (or wholesale replace) the entry for a key.
    pub fn insert(&self, key: CacheKey, entry: CacheEntry) {
        self.entries.insert(key, entry);
    }

    /// Push an entry's expiry forward after a confirmed not-modified
    /// revalidation. Data and token stay untouched. No-op on a missing key.
    pub fn extend_expiry(&self, key: &CacheKey, until: Instant) {
        if let Some(mut entry) = self.entries.get(key) {
            entry.expires_at = until;
            self.entries.insert(key.clone(), entry);
        }
    }

    /// Evict one key.
    pub fn remove(&self, key: &CacheKey) {
        self.entries.invalidate(key);
    }

    /// Evict everything.
    pub fn clear(&self) {
        self.entries.invalidate_all();
    }

    /// Number of resident entries.
    pub fn len(&self) -> usize {
        // entry_count() is eventually consistent; settle pending
        // maintenance first so the count is exact
        self.entries.run_pending_tasks();
        self.entries.entry_count() as usize
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn insert_get_round_trip() {
        let store = CacheEntryStore::new(10);
        let key = CacheKey::bare("clubs/list");
        store.insert(
            key.clone(),
            CacheEntry::new(json!({"clubs": []}), None, Duration::from_secs(60)),
        );

        let entry = store.get(&key).unwrap();
        assert_eq!(entry.data, json!({"clubs": []}));
        assert!(entry.is_fresh());
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entries_stay_resident() {
        let store = CacheEntryStore::new(10);
        let key = CacheKey::bare("clubs/list");
        store.insert(
            key.clone(),
            CacheEntry::new(json!(1), None, Duration::from_secs(1)),
        );

        tokio::time::advance(Duration::from_secs(2)).await;

        let entry = store.get(&key).unwrap();
        assert!(!entry.is_fresh());
    }

    #[tokio::test(start_paused = true)]
    async fn extend_expiry_restores_freshness() {
        let store = CacheEntryStore::new(10);
        let key = CacheKey::bare("clubs/list");
        store.insert(
            key.clone(),
            CacheEntry::new(json!(1), Some("etag-1".into()), Duration::from_secs(1)),
        );

        tokio::time::advance(Duration::from_secs(2)).await;
        store.extend_expiry(&key, Instant::now() + Duration::from_secs(60));

        let entry = store.get(&key).unwrap();
        assert!(entry.is_fresh());
        assert_eq!(entry.token.as_deref(), Some("etag-1"));
    }

    #[test]
    fn remove_is_per_key() {
        let store = CacheEntryStore::new(10);
        let a = CacheKey::bare("a");
        let b = CacheKey::bare("b");
        store.insert(a.clone(), CacheEntry::new(json!(1), None, Duration::ZERO));
        store.insert(b.clone(), CacheEntry::new(json!(2), None, Duration::ZERO));

        store.remove(&a);

        assert!(store.get(&a).is_none());
        assert!(store.get(&b).is_some());
        assert_eq!(store.len(), 1);
    }
}
