use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use munin::storage::MemoryStore;
use munin::traits::{StorageBackend, SyncTransport};
use munin::{
    Connectivity, MuninError, Result, SyncConfig, SyncItem, SyncManager, SyncOperation, SyncQueue,
};

// ============================================================================
// Mock transport
// ============================================================================

/// Transport that records replayed entities in order and fails the
/// entities it is told to reject.
struct RecordingTransport {
    replayed: Mutex<Vec<(String, Value)>>,
    reject: Vec<String>,
}

impl RecordingTransport {
    fn new() -> Self {
        Self::rejecting(&[])
    }

    fn rejecting(entities: &[&str]) -> Self {
        Self {
            replayed: Mutex::new(Vec::new()),
            reject: entities.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn entities(&self) -> Vec<String> {
        self.replayed
            .lock()
            .unwrap()
            .iter()
            .map(|(entity, _)| entity.clone())
            .collect()
    }

    fn payloads(&self) -> Vec<Value> {
        self.replayed
            .lock()
            .unwrap()
            .iter()
            .map(|(_, payload)| payload.clone())
            .collect()
    }
}

#[async_trait]
impl SyncTransport for RecordingTransport {
    async fn replay(&self, item: &SyncItem) -> Result<()> {
        self.replayed
            .lock()
            .unwrap()
            .push((item.entity.clone(), item.payload.clone()));
        if self.reject.contains(&item.entity) {
            return Err(MuninError::Api {
                status: 503,
                message: "unavailable".into(),
            });
        }
        Ok(())
    }
}

async fn manager(transport: Arc<RecordingTransport>) -> (Arc<SyncManager>, Connectivity) {
    let storage: Arc<dyn StorageBackend> = Arc::new(MemoryStore::new());
    manager_with_storage(transport, storage).await
}

async fn manager_with_storage(
    transport: Arc<RecordingTransport>,
    storage: Arc<dyn StorageBackend>,
) -> (Arc<SyncManager>, Connectivity) {
    let connectivity = Connectivity::new();
    let queue = Arc::new(SyncQueue::load(storage).await);
    let manager = Arc::new(SyncManager::new(
        queue,
        transport,
        connectivity.clone(),
        &SyncConfig::new().min_sync_interval(Duration::ZERO),
    ));
    (manager, connectivity)
}

// ============================================================================
// Drain semantics
// ============================================================================

#[tokio::test]
async fn drain_replays_in_fifo_order() {
    let transport = Arc::new(RecordingTransport::new());
    let (manager, _connectivity) = manager(transport.clone()).await;
    manager.enqueue("a", SyncOperation::Create, json!(1)).await;
    manager.enqueue("b", SyncOperation::Update, json!(2)).await;
    manager.enqueue("c", SyncOperation::Delete, json!(3)).await;

    let report = manager.drain().await.unwrap();

    assert_eq!(transport.entities(), vec!["a", "b", "c"]);
    assert_eq!(report.attempted, 3);
    assert_eq!(report.succeeded, 3);
    assert_eq!(report.failed, 0);
    assert_eq!(report.remaining, 0);
}

#[tokio::test]
async fn failed_item_stays_queued_without_aborting_the_pass() {
    let transport = Arc::new(RecordingTransport::rejecting(&["b"]));
    let (manager, _connectivity) = manager(transport.clone()).await;
    manager.enqueue("a", SyncOperation::Create, json!(1)).await;
    manager.enqueue("b", SyncOperation::Update, json!(2)).await;
    manager.enqueue("c", SyncOperation::Delete, json!(3)).await;

    let report = manager.drain().await.unwrap();

    // every item got its one attempt, in order
    assert_eq!(transport.entities(), vec!["a", "b", "c"]);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.remaining, 1);

    let status = manager.status();
    assert_eq!(status.queue_length, 1);
    assert_eq!(status.errors.len(), 1);
    assert!(status.errors[0].contains("503"));
    assert!(!status.is_syncing);
    assert!(status.last_sync_time.is_some());

    // the failed item carries its bookkeeping and drains again next pass
    let transport_calls_before = transport.entities().len();
    let report = manager.drain().await.unwrap();
    assert_eq!(report.attempted, 1);
    assert_eq!(transport.entities().len(), transport_calls_before + 1);

    let item = &manager.items()[0];
    assert_eq!(item.entity, "b");
    assert_eq!(item.retries, 2);
}

#[tokio::test]
async fn booking_update_enqueued_offline_replays_once_on_reconnect() {
    let transport = Arc::new(RecordingTransport::new());
    let (manager, connectivity) = manager(transport.clone()).await;

    connectivity.set_online(false);
    manager
        .enqueue(
            "booking",
            SyncOperation::Update,
            json!({"id": 42, "status": "confirmed"}),
        )
        .await;
    assert_eq!(manager.status().queue_length, 1);

    connectivity.set_online(true);
    let report = manager.drain().await.unwrap();

    assert_eq!(report.succeeded, 1);
    assert_eq!(manager.status().queue_length, 0);
    assert_eq!(transport.payloads(), vec![json!({"id": 42, "status": "confirmed"})]);
}

#[tokio::test]
async fn drain_while_offline_is_refused() {
    let transport = Arc::new(RecordingTransport::new());
    let (manager, connectivity) = manager(transport.clone()).await;
    manager.enqueue("a", SyncOperation::Create, json!(1)).await;

    connectivity.set_online(false);
    let result = manager.drain().await;

    assert!(matches!(result, Err(MuninError::Offline)));
    assert!(transport.entities().is_empty());
    assert_eq!(manager.status().queue_length, 1);
}

#[tokio::test(start_paused = true)]
async fn drain_is_rate_limited() {
    let transport = Arc::new(RecordingTransport::new());
    let storage: Arc<dyn StorageBackend> = Arc::new(MemoryStore::new());
    let connectivity = Connectivity::new();
    let queue = Arc::new(SyncQueue::load(storage).await);
    let manager = SyncManager::new(
        queue,
        transport,
        connectivity,
        &SyncConfig::new().min_sync_interval(Duration::from_secs(30)),
    );

    manager.drain().await.unwrap();

    match manager.drain().await {
        Err(MuninError::RateLimited {
            retry_after: Some(wait),
        }) => {
            assert!(wait > Duration::ZERO);
            assert!(wait <= Duration::from_secs(30));
        }
        other => panic!("expected rate-limited drain, got {other:?}"),
    }

    // past the interval the drain is permitted again
    tokio::time::advance(Duration::from_secs(30)).await;
    manager.drain().await.unwrap();
}

// ============================================================================
// Durability & cancellation
// ============================================================================

#[tokio::test]
async fn queued_items_survive_restart_and_replay() {
    let storage: Arc<dyn StorageBackend> = Arc::new(MemoryStore::new());
    let transport = Arc::new(RecordingTransport::new());

    {
        let (manager, connectivity) =
            manager_with_storage(transport.clone(), storage.clone()).await;
        connectivity.set_online(false);
        manager
            .enqueue("booking", SyncOperation::Update, json!({"id": 42}))
            .await;
    }

    // "restart": everything rebuilt from the same durable storage
    let (manager, _connectivity) = manager_with_storage(transport.clone(), storage).await;
    assert_eq!(manager.status().queue_length, 1);

    let report = manager.drain().await.unwrap();
    assert_eq!(report.succeeded, 1);
    assert_eq!(transport.payloads(), vec![json!({"id": 42})]);
}

#[tokio::test]
async fn cancel_is_the_only_non_success_exit() {
    let transport = Arc::new(RecordingTransport::rejecting(&["bad"]));
    let (manager, _connectivity) = manager(transport.clone()).await;
    let poisoned = manager
        .enqueue("bad", SyncOperation::Create, json!(1))
        .await;
    manager.enqueue("good", SyncOperation::Create, json!(2)).await;

    // replay failures never drop the item
    manager.drain().await.unwrap();
    assert_eq!(manager.status().queue_length, 1);

    assert!(manager.cancel(&poisoned).await);
    assert!(!manager.cancel(&poisoned).await);
    assert_eq!(manager.status().queue_length, 0);
}

// ============================================================================
// Reconnect watcher
// ============================================================================

#[tokio::test(start_paused = true)]
async fn reconnect_triggers_background_drain() {
    let transport = Arc::new(RecordingTransport::new());
    let (manager, connectivity) = manager(transport.clone()).await;
    let watcher = Arc::clone(&manager).watch_connectivity();

    connectivity.set_online(false);
    manager
        .enqueue("booking", SyncOperation::Update, json!({"id": 42}))
        .await;

    connectivity.set_online(true);
    for _ in 0..20 {
        if manager.status().queue_length == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(manager.status().queue_length, 0);
    assert_eq!(transport.entities(), vec!["booking"]);
    watcher.abort();
}

#[tokio::test(start_paused = true)]
async fn status_stream_reports_progress() {
    use tokio_stream::StreamExt;

    let transport = Arc::new(RecordingTransport::new());
    let (manager, _connectivity) = manager(transport).await;
    let mut stream = manager.status_stream();

    // initial snapshot
    let status = stream.next().await.unwrap();
    assert_eq!(status.queue_length, 0);

    manager.enqueue("a", SyncOperation::Create, json!(1)).await;
    let status = stream.next().await.unwrap();
    assert_eq!(status.queue_length, 1);
}
