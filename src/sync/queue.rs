use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::warn;

use crate::telemetry;
use crate::traits::StorageBackend;
use crate::types::{SyncItem, SyncOperation, unix_millis};

/// Storage key for the persisted queue snapshot.
const STORAGE_KEY: &str = "munin.sync_queue";

/// Durable FIFO queue of buffered write operations.
///
/// The in-memory list is the source of truth; every mutation persists the
/// full snapshot best-effort (a failed write is logged and counted, the
/// mutation stands). [`load`](SyncQueue::load) reconstructs the queue
/// from the snapshot at startup, which is what makes an offline action
/// survive a process restart.
pub struct SyncQueue {
    items: Mutex<Vec<SyncItem>>,
    storage: Arc<dyn StorageBackend>,
    sequence: AtomicU64,
}

impl SyncQueue {
    /// Reload the persisted queue, starting empty if the snapshot is
    /// missing or unreadable.
    pub async fn load(storage: Arc<dyn StorageBackend>) -> Self {
        let items: Vec<SyncItem> = match storage.get(STORAGE_KEY).await {
            Ok(Some(snapshot)) => match serde_json::from_str(&snapshot) {
                Ok(items) => items,
                Err(e) => {
                    warn!(error = %e, "discarding corrupt sync queue snapshot");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "reading sync queue snapshot failed");
                Vec::new()
            }
        };
        Self {
            items: Mutex::new(items),
            storage,
            sequence: AtomicU64::new(0),
        }
    }

    /// Append a write operation and persist the queue. Returns the
    /// generated item id.
    pub async fn enqueue(&self, entity: &str, operation: SyncOperation, payload: Value) -> String {
        let enqueued_at = unix_millis();
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let id = format!("{entity}-{enqueued_at}-{sequence}");
        self.items.lock().unwrap().push(SyncItem {
            id: id.clone(),
            entity: entity.to_owned(),
            operation,
            payload,
            retries: 0,
            last_error: None,
            enqueued_at,
        });
        self.persist().await;
        id
    }

    /// Remove an item on the user's request. Returns whether it existed.
    pub async fn cancel(&self, id: &str) -> bool {
        let removed = self.take(id);
        if removed {
            self.persist().await;
        }
        removed
    }

    /// Snapshot of the queue in enqueue order.
    pub fn items(&self) -> Vec<SyncItem> {
        self.items.lock().unwrap().clone()
    }

    /// Last error of each item that has failed at least once, in enqueue
    /// order.
    pub fn errors(&self) -> Vec<String> {
        self.items
            .lock()
            .unwrap()
            .iter()
            .filter_map(|item| item.last_error.clone())
            .collect()
    }

    /// Items currently queued.
    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove an item after a successful replay. In-memory only; the
    /// drain pass persists once at the end.
    pub(crate) fn take(&self, id: &str) -> bool {
        let mut items = self.items.lock().unwrap();
        let before = items.len();
        items.retain(|item| item.id != id);
        items.len() < before
    }

    /// Record a failed replay attempt: bump the retry count, remember the
    /// error, keep the item.
    pub(crate) fn record_failure(&self, id: &str, message: String) {
        let mut items = self.items.lock().unwrap();
        if let Some(item) = items.iter_mut().find(|item| item.id == id) {
            item.retries += 1;
            item.last_error = Some(message);
        }
    }

    /// Write the current snapshot through the storage backend,
    /// best-effort.
    pub(crate) async fn persist(&self) {
        let snapshot = {
            let items = self.items.lock().unwrap();
            match serde_json::to_string(&*items) {
                Ok(s) => s,
                Err(e) => {
                    warn!(error = %e, "serializing sync queue failed");
                    return;
                }
            }
        };
        if let Err(e) = self.storage.set(STORAGE_KEY, &snapshot).await {
            metrics::counter!(telemetry::PERSIST_FAILURES_TOTAL, "store" => "queue").increment(1);
            warn!(error = %e, "persisting sync queue failed");
        }
    }
}
