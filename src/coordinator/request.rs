//! The request coordinator.
//!
//! Answers "execute or reuse" for a keyed read: concurrent identical
//! requests collapse onto one in-flight network call, fresh cache entries
//! short-circuit the network entirely, and the conditional variant offers
//! the stored freshness token so the backend can answer "not modified"
//! instead of shipping a full payload.
//!
//! Payloads cross this layer as canonical JSON (`serde_json::Value`); the
//! public operations are generic over any `Serialize + DeserializeOwned`
//! type, so callers keep their typed models while the stores stay
//! monomorphic.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::cache::{CacheConfig, CacheEntryStore, PendingRequestTracker, RevalidationTokenStore};
use crate::connectivity::Connectivity;
use crate::telemetry;
use crate::traits::StorageBackend;
use crate::types::{CacheEntry, CacheKey, FetchOptions, Revalidation};
use crate::{MuninError, Result};

/// Counters for the UI-facing cache panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Cached payloads currently resident (fresh or stale).
    pub cache_size: usize,
    /// Fetches currently in flight.
    pub pending_requests: usize,
    /// Revalidation tokens currently stored.
    pub etag_count: usize,
}

/// Orchestrates the cache entry store, pending tracker, and token store
/// to minimise redundant network calls for keyed reads.
///
/// Constructed per application (typically once, via
/// [`Munin::builder()`](crate::Munin::builder)); all state is instance
/// state, so tests get full isolation from a fresh instance.
pub struct RequestCoordinator {
    entries: CacheEntryStore,
    pending: PendingRequestTracker,
    tokens: RevalidationTokenStore,
    connectivity: Option<Connectivity>,
    dedup_window: Duration,
}

impl RequestCoordinator {
    /// Create a coordinator, reloading persisted revalidation tokens from
    /// `storage`.
    pub async fn new(
        config: &CacheConfig,
        storage: Arc<dyn StorageBackend>,
        connectivity: Option<Connectivity>,
    ) -> Self {
        Self {
            entries: CacheEntryStore::new(config.max_entries),
            pending: PendingRequestTracker::new(),
            tokens: RevalidationTokenStore::load(storage).await,
            connectivity,
            dedup_window: config.dedup_window,
        }
    }

    /// Execute a keyed read with deduplication and a time-to-live.
    ///
    /// Unless `options.force_refresh` is set:
    /// - a fetch for `key` already in flight (and younger than the dedup
    ///   window) is joined — the supplier is **not** called, and this
    ///   caller observes the exact same resolution or failure;
    /// - a fresh cache entry is returned with no network call.
    ///
    /// Otherwise the supplier runs, registered as the pending fetch for
    /// `key` before it settles so concurrent callers dedupe against it.
    /// Success replaces the cache entry wholesale; failure propagates to
    /// every attached caller and leaves any existing entry untouched.
    pub async fn execute<T, F, Fut>(
        &self,
        key: &CacheKey,
        supplier: F,
        options: &FetchOptions,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        if !options.force_refresh {
            if let Some(handle) = self.pending.join(key, self.dedup_window) {
                metrics::counter!(telemetry::DEDUP_JOINS_TOTAL).increment(1);
                debug!(key = %key, "joining in-flight fetch");
                return from_value(handle.await?);
            }
            if let Some(entry) = self.entries.get(key) {
                if entry.is_fresh() {
                    metrics::counter!(telemetry::CACHE_HITS_TOTAL, "strategy" => "ttl")
                        .increment(1);
                    return from_value(entry.data);
                }
            }
            metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "strategy" => "ttl").increment(1);
        }

        let ttl = options.cache_duration;
        let supplier_fut = supplier();
        let candidate = PendingRequestTracker::share(async move {
            let data = supplier_fut.await?;
            Ok(serde_json::to_value(&data)?)
        });

        let (handle, owner) = if options.force_refresh {
            let generation = self.pending.register(key, candidate.clone());
            (candidate, Some(generation))
        } else {
            self.pending.acquire(key, self.dedup_window, candidate)
        };

        let Some(generation) = owner else {
            // lost the registration race to a concurrent caller
            metrics::counter!(telemetry::DEDUP_JOINS_TOTAL).increment(1);
            return from_value(handle.await?);
        };

        let outcome = handle.await;
        self.pending.settle(key, generation);
        match outcome {
            Ok(value) => {
                self.entries
                    .insert(key.clone(), CacheEntry::new(value.clone(), None, ttl));
                from_value(value)
            }
            Err(e) => Err(e),
        }
    }

    /// Execute a keyed read with conditional (ETag-style) revalidation.
    ///
    /// The supplier receives the stored token (if any) and resolves to
    /// [`Revalidation::Modified`] or [`Revalidation::NotModified`]. A
    /// not-modified answer extends the cached entry's validity window
    /// without touching its data or token. A failed supplier falls back
    /// to cached data — even expired — when any exists; the error only
    /// propagates against an empty cache. When the connectivity observer
    /// reports offline and a cached entry exists, the supplier is skipped
    /// outright and the entry served as-is.
    ///
    /// The supplier may be called twice in one edge case: a not-modified
    /// answer with no resident entry (the token outlived the in-memory
    /// cache, e.g. across a restart) discards the token and refetches
    /// unconditionally.
    pub async fn execute_with_revalidation<T, F, Fut>(
        &self,
        key: &CacheKey,
        supplier: F,
        options: &FetchOptions,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: Fn(Option<String>) -> Fut,
        Fut: Future<Output = Result<Revalidation<T>>>,
    {
        if !options.force_refresh {
            if let Some(entry) = self.entries.get(key) {
                if entry.is_fresh() {
                    metrics::counter!(telemetry::CACHE_HITS_TOTAL, "strategy" => "revalidate")
                        .increment(1);
                    return from_value(entry.data);
                }
            }
            metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "strategy" => "revalidate")
                .increment(1);
        }

        if let Some(conn) = &self.connectivity {
            if conn.is_offline() {
                if let Some(entry) = self.entries.get(key) {
                    metrics::counter!(telemetry::STALE_SERVED_TOTAL).increment(1);
                    debug!(key = %key, "offline, serving cached data");
                    return from_value(entry.data);
                }
            }
        }

        let ttl = options.cache_duration;
        match supplier(self.tokens.get(key)).await {
            Ok(Revalidation::NotModified) => {
                if let Some(entry) = self.entries.get(key) {
                    self.entries.extend_expiry(key, Instant::now() + ttl);
                    metrics::counter!(telemetry::NOT_MODIFIED_TOTAL).increment(1);
                    return from_value(entry.data);
                }
                // Not-modified against an empty cache: the token outlived
                // the entry. Discard it and fetch unconditionally.
                debug!(key = %key, "not-modified without cached entry, refetching in full");
                self.tokens.remove(key).await;
                match supplier(None).await {
                    Ok(Revalidation::Modified { data, token }) => {
                        self.store_revalidated(key, data, token, ttl).await
                    }
                    Ok(Revalidation::NotModified) => Err(MuninError::Network(
                        "not-modified response to an unconditional request".into(),
                    )),
                    Err(e) => Err(e),
                }
            }
            Ok(Revalidation::Modified { data, token }) => {
                self.store_revalidated(key, data, token, ttl).await
            }
            Err(e) => {
                if let Some(entry) = self.entries.get(key) {
                    metrics::counter!(telemetry::STALE_SERVED_TOTAL).increment(1);
                    warn!(key = %key, error = %e, "refresh failed, serving stale data");
                    return from_value(entry.data);
                }
                Err(e)
            }
        }
    }

    async fn store_revalidated<T: Serialize>(
        &self,
        key: &CacheKey,
        data: T,
        token: Option<String>,
        ttl: Duration,
    ) -> Result<T> {
        let value = serde_json::to_value(&data)?;
        self.entries
            .insert(key.clone(), CacheEntry::new(value, token.clone(), ttl));
        match token {
            Some(token) => self.tokens.set(key, token).await,
            None => self.tokens.remove(key).await,
        }
        Ok(data)
    }

    /// Evict one key — its cache entry, pending fetch, and token — or
    /// everything when no key is given.
    pub async fn clear(&self, key: Option<&CacheKey>) {
        match key {
            Some(key) => {
                self.entries.remove(key);
                self.pending.remove(key);
                self.tokens.remove(key).await;
            }
            None => {
                self.entries.clear();
                self.pending.clear();
                self.tokens.clear().await;
            }
        }
    }

    /// Current store sizes.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            cache_size: self.entries.len(),
            pending_requests: self.pending.len(),
            etag_count: self.tokens.len(),
        }
    }
}

fn from_value<T: DeserializeOwned>(value: Value) -> Result<T> {
    Ok(serde_json::from_value(value)?)
}
