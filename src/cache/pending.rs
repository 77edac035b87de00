use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use serde_json::Value;
use tokio::time::Instant;

use crate::Result;
use crate::types::CacheKey;

/// The shared handle to an in-flight fetch.
///
/// A `Shared` future: cloning it attaches another caller, and every clone
/// observes the identical settled result — the same payload or the same
/// (cloned) error. The underlying supplier is polled once no matter how
/// many callers attach.
pub type SharedFetch = Shared<BoxFuture<'static, Result<Value>>>;

struct PendingFetch {
    generation: u64,
    started_at: Instant,
    handle: SharedFetch,
}

/// In-memory map from request key to its in-flight fetch.
///
/// Each registration gets a generation number; settling compares it so a
/// finishing fetch never evicts a newer one that replaced it. The lock is
/// only ever held across map operations, never across an `.await`.
#[derive(Default)]
pub struct PendingRequestTracker {
    inflight: Mutex<HashMap<CacheKey, PendingFetch>>,
    generations: AtomicU64,
}

impl PendingRequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Box and share a supplier's future in the form the tracker stores.
    pub fn share(fut: impl Future<Output = Result<Value>> + Send + 'static) -> SharedFetch {
        let boxed: BoxFuture<'static, Result<Value>> = Box::pin(fut);
        boxed.shared()
    }

    /// Attach to an existing fetch for `key`, if one started within the
    /// deduplication `window`. Older pending fetches (a hung supplier) are
    /// ignored, so one stuck call cannot block the key forever.
    pub fn join(&self, key: &CacheKey, window: Duration) -> Option<SharedFetch> {
        let inflight = self.inflight.lock().unwrap();
        inflight
            .get(key)
            .filter(|p| p.started_at.elapsed() <= window)
            .map(|p| p.handle.clone())
    }

    /// Get-or-insert under one lock: if a fetch for `key` started within
    /// `window`, return its handle and no generation; otherwise register
    /// `candidate` and return it with the generation that marks the caller
    /// as its owner.
    ///
    /// The owner drives the handle and calls [`settle`](Self::settle) when
    /// it resolves. A losing candidate is simply dropped — its supplier
    /// future was never polled, so no network call happens.
    pub fn acquire(
        &self,
        key: &CacheKey,
        window: Duration,
        candidate: SharedFetch,
    ) -> (SharedFetch, Option<u64>) {
        let mut inflight = self.inflight.lock().unwrap();
        if let Some(existing) = inflight
            .get(key)
            .filter(|p| p.started_at.elapsed() <= window)
        {
            return (existing.handle.clone(), None);
        }
        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        inflight.insert(
            key.clone(),
            PendingFetch {
                generation,
                started_at: Instant::now(),
                handle: candidate.clone(),
            },
        );
        (candidate, Some(generation))
    }

    /// Register `candidate` unconditionally, replacing any existing fetch
    /// for `key`. Used by forced refreshes, which must issue their own
    /// network call while still letting later callers dedupe against it.
    /// Returns the owner generation.
    pub fn register(&self, key: &CacheKey, candidate: SharedFetch) -> u64 {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        self.inflight.lock().unwrap().insert(
            key.clone(),
            PendingFetch {
                generation,
                started_at: Instant::now(),
                handle: candidate,
            },
        );
        generation
    }

    /// Remove the entry for `key`, but only if it still belongs to
    /// `generation`.
    pub fn settle(&self, key: &CacheKey, generation: u64) {
        let mut inflight = self.inflight.lock().unwrap();
        if inflight.get(key).is_some_and(|p| p.generation == generation) {
            inflight.remove(key);
        }
    }

    /// Drop the entry for `key` regardless of owner.
    pub fn remove(&self, key: &CacheKey) {
        self.inflight.lock().unwrap().remove(key);
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.inflight.lock().unwrap().clear();
    }

    /// Number of in-flight fetches.
    pub fn len(&self) -> usize {
        self.inflight.lock().unwrap().len()
    }

    /// Whether nothing is in flight.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ready_fetch(value: Value) -> SharedFetch {
        PendingRequestTracker::share(async move { Ok(value) })
    }

    #[tokio::test(start_paused = true)]
    async fn join_within_window() {
        let tracker = PendingRequestTracker::new();
        let key = CacheKey::bare("clubs/list");
        tracker.register(&key, ready_fetch(json!(1)));

        assert!(tracker.join(&key, Duration::from_secs(2)).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn join_ignores_stale_pending() {
        let tracker = PendingRequestTracker::new();
        let key = CacheKey::bare("clubs/list");
        tracker.register(&key, ready_fetch(json!(1)));

        tokio::time::advance(Duration::from_secs(3)).await;

        assert!(tracker.join(&key, Duration::from_secs(2)).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_joins_existing() {
        let tracker = PendingRequestTracker::new();
        let key = CacheKey::bare("clubs/list");
        let (first, owner) = tracker.acquire(&key, Duration::from_secs(2), ready_fetch(json!(1)));
        assert!(owner.is_some());

        let (second, joiner) = tracker.acquire(&key, Duration::from_secs(2), ready_fetch(json!(2)));
        assert!(joiner.is_none());
        assert_eq!(tracker.len(), 1);

        // both handles resolve to the first registration's value
        assert_eq!(first.await.unwrap(), json!(1));
        assert_eq!(second.await.unwrap(), json!(1));
    }

    #[tokio::test(start_paused = true)]
    async fn settle_spares_replacement() {
        let tracker = PendingRequestTracker::new();
        let key = CacheKey::bare("clubs/list");
        let old = tracker.register(&key, ready_fetch(json!(1)));
        tracker.register(&key, ready_fetch(json!(2)));

        tracker.settle(&key, old);

        assert_eq!(tracker.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn settle_removes_own_registration() {
        let tracker = PendingRequestTracker::new();
        let key = CacheKey::bare("clubs/list");
        let generation = tracker.register(&key, ready_fetch(json!(1)));

        tracker.settle(&key, generation);

        assert!(tracker.is_empty());
    }
}
