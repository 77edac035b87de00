//! Sync queue items and aggregate status.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Milliseconds since the Unix epoch, for persisted timestamps.
pub(crate) fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// The kind of mutation a queued item performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOperation {
    Create,
    Update,
    Delete,
}

impl SyncOperation {
    /// Lowercase tag, as persisted and as shown in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncOperation::Create => "create",
            SyncOperation::Update => "update",
            SyncOperation::Delete => "delete",
        }
    }
}

/// One buffered write awaiting replay.
///
/// Items stay queued until they succeed or the user cancels them — a
/// failed replay increments `retries` and records `last_error`, it never
/// discards the item. Serde round-trips as JSON for the persisted queue
/// snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncItem {
    /// Unique id, assigned at enqueue time.
    pub id: String,
    /// Entity tag the operation targets (e.g. "booking").
    pub entity: String,
    /// What to do to the entity.
    pub operation: SyncOperation,
    /// Request body, opaque to munin.
    pub payload: Value,
    /// Failed replay attempts so far.
    pub retries: u32,
    /// Message from the most recent failed attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Unix milliseconds at enqueue time.
    pub enqueued_at: u64,
}

/// Aggregate sync state, published for the UI status banner.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncStatus {
    /// Whether a drain pass is currently running.
    pub is_syncing: bool,
    /// Items still awaiting replay.
    pub queue_length: usize,
    /// Last error of each still-queued item that has failed at least once.
    pub errors: Vec<String>,
    /// Unix milliseconds when the last drain pass finished.
    pub last_sync_time: Option<u64>,
}

/// Outcome of one drain pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    /// Items attempted this pass.
    pub attempted: usize,
    /// Items replayed successfully and removed.
    pub succeeded: usize,
    /// Items that failed and remain queued.
    pub failed: usize,
    /// Queue length after the pass.
    pub remaining: usize,
}
