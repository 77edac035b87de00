//! Boundary traits for the host application.
//!
//! Munin mediates access to a network and a durable store it does not own.
//! The host supplies both: [`StorageBackend`] for persistence of the
//! revalidation-token map and the sync queue, and [`SyncTransport`] for
//! replaying queued mutations against the backend. Read-path network calls
//! are supplied per-request as closures on
//! [`RequestCoordinator`](crate::RequestCoordinator), not through a trait —
//! each endpoint fetch is its own operation.

use async_trait::async_trait;

use crate::Result;
use crate::types::SyncItem;

/// Durable string-keyed store.
///
/// Munin persists two JSON snapshots through this interface: the
/// revalidation-token map and the sync queue, both written wholesale and
/// reloaded at startup. Implementations must survive process restarts;
/// everything else (encryption, platform keychain, SQLite, a plain file)
/// is the host's business.
///
/// Two implementations ship with the crate: [`MemoryStore`](crate::MemoryStore)
/// (non-durable, for tests and opt-out) and [`JsonFileStore`](crate::JsonFileStore).
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Read the value stored under `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key` if present.
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Replays one queued mutation against the backend.
///
/// The transport performs exactly one network operation per call — munin
/// never constructs URLs, headers, or bodies. Return `Ok(())` when the
/// backend accepted the operation; any error leaves the item queued for a
/// later drain pass (see [`SyncManager`](crate::SyncManager) for the retry
/// policy).
#[async_trait]
pub trait SyncTransport: Send + Sync {
    /// Perform the network call for `item`.
    async fn replay(&self, item: &SyncItem) -> Result<()>;
}
