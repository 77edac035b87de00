//! Cached payloads and conditional-fetch outcomes.

use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;

/// A cached payload with its validity window.
///
/// Owned exclusively by the [`CacheEntryStore`](crate::cache::CacheEntryStore):
/// replaced wholesale on every successful fetch, never mutated in place
/// except to extend `expires_at` on a confirmed not-modified revalidation.
/// Invariant: `expires_at >= created_at`.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The payload, as canonical JSON.
    pub data: Value,
    /// Freshness token (ETag) returned alongside the payload, if any.
    pub token: Option<String>,
    /// When the payload was fetched.
    pub created_at: Instant,
    /// When the payload stops being fresh. Expired entries are retained
    /// for the stale-on-error fallback; staleness is judged per read.
    pub expires_at: Instant,
}

impl CacheEntry {
    /// Create an entry fetched now, fresh for `ttl`.
    pub fn new(data: Value, token: Option<String>, ttl: Duration) -> Self {
        let now = Instant::now();
        Self {
            data,
            token,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// Whether the entry is still within its validity window.
    pub fn is_fresh(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Outcome of a conditional (token-carrying) fetch.
///
/// Suppliers passed to
/// [`execute_with_revalidation`](crate::RequestCoordinator::execute_with_revalidation)
/// resolve to this: either a fresh payload with its new token, or an
/// explicit signal that the server confirmed the cached payload unchanged
/// (an HTTP 304 against the offered ETag).
#[derive(Debug)]
pub enum Revalidation<T> {
    /// Server returned a full payload, superseding whatever was cached.
    Modified {
        data: T,
        /// Token to offer on the next conditional fetch. `None` clears
        /// any previously stored token for the key.
        token: Option<String>,
    },
    /// Server confirmed the offered token still matches; the cached
    /// payload stays valid and its window is extended.
    NotModified,
}
