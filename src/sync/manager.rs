use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, warn};

use super::queue::SyncQueue;
use super::rate_limit::RateLimiter;
use crate::connectivity::Connectivity;
use crate::telemetry;
use crate::traits::SyncTransport;
use crate::types::{DrainReport, SyncItem, SyncOperation, SyncStatus, unix_millis};
use crate::{MuninError, Result};

/// Default minimum spacing between drain passes.
const DEFAULT_MIN_SYNC_INTERVAL: Duration = Duration::from_secs(30);

/// Configuration for the sync manager.
///
/// ```rust
/// # use munin::SyncConfig;
/// # use std::time::Duration;
/// let config = SyncConfig::new().min_sync_interval(Duration::from_secs(60));
/// ```
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Minimum spacing between drain passes. Default: 30 seconds.
    pub min_sync_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            min_sync_interval: DEFAULT_MIN_SYNC_INTERVAL,
        }
    }
}

impl SyncConfig {
    /// Create a config with the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum spacing between drain passes.
    pub fn min_sync_interval(mut self, interval: Duration) -> Self {
        self.min_sync_interval = interval;
        self
    }
}

/// Drains the sync queue against the network and reports aggregate
/// status to the UI layer.
///
/// All writes go through the manager (`enqueue`, `cancel`, `drain`) so
/// the published [`SyncStatus`] always reflects the queue. The manager is
/// interruptible only between items: one in-flight replay is never
/// aborted mid-call.
pub struct SyncManager {
    queue: Arc<SyncQueue>,
    transport: Arc<dyn SyncTransport>,
    connectivity: Connectivity,
    limiter: RateLimiter,
    status_tx: watch::Sender<SyncStatus>,
}

impl SyncManager {
    pub fn new(
        queue: Arc<SyncQueue>,
        transport: Arc<dyn SyncTransport>,
        connectivity: Connectivity,
        config: &SyncConfig,
    ) -> Self {
        let status_tx = watch::channel(SyncStatus {
            queue_length: queue.len(),
            errors: queue.errors(),
            ..SyncStatus::default()
        })
        .0;
        Self {
            queue,
            transport,
            connectivity,
            limiter: RateLimiter::new(config.min_sync_interval),
            status_tx,
        }
    }

    /// Buffer a write operation for later replay. Returns the item id,
    /// usable with [`cancel`](Self::cancel).
    pub async fn enqueue(&self, entity: &str, operation: SyncOperation, payload: Value) -> String {
        let id = self.queue.enqueue(entity, operation, payload).await;
        self.publish(false, None);
        id
    }

    /// Remove a queued item on the user's behalf — the only way an item
    /// leaves the queue other than a successful replay.
    pub async fn cancel(&self, id: &str) -> bool {
        let removed = self.queue.cancel(id).await;
        if removed {
            self.publish(false, None);
        }
        removed
    }

    /// Replay every queued item, in enqueue order, one attempt each.
    ///
    /// Refused with [`MuninError::Offline`] when the connectivity
    /// observer reports no network, and with [`MuninError::RateLimited`]
    /// (carrying the remaining wait) when invoked before the minimum
    /// interval has elapsed — see [`format_wait`](super::format_wait) for
    /// rendering that wait to the user.
    ///
    /// A failed item stays queued with `retries` incremented and
    /// `last_error` recorded, and the pass continues with subsequent
    /// items: later operations may be independent of the failed one.
    /// Failure classification is left to the next drain — transient and
    /// permanent rejections are treated alike here, and permanently
    /// rejected items are for the user to cancel.
    pub async fn drain(&self) -> Result<DrainReport> {
        if self.connectivity.is_offline() {
            return Err(MuninError::Offline);
        }
        if !self.limiter.can_sync() {
            return Err(MuninError::RateLimited {
                retry_after: Some(self.limiter.remaining_wait()),
            });
        }
        self.limiter.record_attempt();
        metrics::counter!(telemetry::SYNC_DRAINS_TOTAL).increment(1);

        let items = self.queue.items();
        let attempted = items.len();
        self.publish(true, None);

        let mut succeeded = 0;
        let mut failed = 0;
        for item in items {
            match self.replay(&item).await {
                Ok(()) => {
                    self.queue.take(&item.id);
                    succeeded += 1;
                }
                Err(e) => {
                    warn!(
                        id = %item.id,
                        entity = %item.entity,
                        retries = item.retries + 1,
                        error = %e,
                        "replay failed, keeping item queued"
                    );
                    self.queue.record_failure(&item.id, e.to_string());
                    failed += 1;
                }
            }
        }
        self.queue.persist().await;
        self.publish(false, Some(unix_millis()));

        Ok(DrainReport {
            attempted,
            succeeded,
            failed,
            remaining: self.queue.len(),
        })
    }

    async fn replay(&self, item: &SyncItem) -> Result<()> {
        debug!(
            id = %item.id,
            entity = %item.entity,
            operation = item.operation.as_str(),
            "replaying queued operation"
        );
        let result = self.transport.replay(item).await;
        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(telemetry::SYNC_REPLAYS_TOTAL, "status" => status).increment(1);
        result
    }

    /// Snapshot of the queued items in enqueue order, for a
    /// pending-actions list with per-item cancel.
    pub fn items(&self) -> Vec<SyncItem> {
        self.queue.items()
    }

    /// Current aggregate status.
    pub fn status(&self) -> SyncStatus {
        self.status_tx.borrow().clone()
    }

    /// Status updates as a stream, for the UI banner.
    pub fn status_stream(&self) -> WatchStream<SyncStatus> {
        WatchStream::new(self.status_tx.subscribe())
    }

    /// Spawn a background task that drains the queue on every
    /// offline→online transition. Rate-limited or failed auto-drains are
    /// logged and skipped; the next transition (or a manual sync) picks
    /// the queue up again. Abort the returned handle at shutdown.
    pub fn watch_connectivity(self: Arc<Self>) -> JoinHandle<()> {
        // subscribing here (not inside the task) pins the baseline to the
        // state at call time, so no transition can slip past before the
        // task's first poll
        let mut rx = self.connectivity.subscribe();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let online = *rx.borrow_and_update();
                if !online {
                    continue;
                }
                match self.drain().await {
                    Ok(report) => debug!(
                        succeeded = report.succeeded,
                        failed = report.failed,
                        remaining = report.remaining,
                        "drained sync queue after reconnect"
                    ),
                    Err(e) => debug!(error = %e, "auto sync skipped"),
                }
            }
        })
    }

    fn publish(&self, is_syncing: bool, finished_at: Option<u64>) {
        let last_sync_time = finished_at.or(self.status_tx.borrow().last_sync_time);
        self.status_tx.send_replace(SyncStatus {
            is_syncing,
            queue_length: self.queue.len(),
            errors: self.queue.errors(),
            last_sync_time,
        });
    }
}
