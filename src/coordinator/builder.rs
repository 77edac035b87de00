//! Builder and client facade.

use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::task::JoinHandle;

use super::request::{CacheStats, RequestCoordinator};
use crate::cache::CacheConfig;
use crate::connectivity::Connectivity;
use crate::storage::MemoryStore;
use crate::sync::{SyncConfig, SyncManager, SyncQueue};
use crate::traits::{StorageBackend, SyncTransport};
use crate::types::{CacheKey, DrainReport, SyncOperation};
use crate::{MuninError, Result};

/// Main entry point for creating client instances.
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use async_trait::async_trait;
/// use munin::{CacheKey, FetchOptions, Munin, Result, SyncItem, SyncTransport};
///
/// struct HttpTransport;
///
/// #[async_trait]
/// impl SyncTransport for HttpTransport {
///     async fn replay(&self, _item: &SyncItem) -> Result<()> {
///         // one HTTP call per queued item, via the app's API client
///         Ok(())
///     }
/// }
///
/// #[tokio::main]
/// async fn main() -> Result<()> {
///     let client = Munin::builder()
///         .transport(Arc::new(HttpTransport))
///         .build()
///         .await?;
///
///     let bookings: Vec<String> = client
///         .coordinator()
///         .execute(
///             &CacheKey::new("bookings/list", &42)?,
///             || async { Ok(vec!["b-1".to_string()]) },
///             &FetchOptions::new(),
///         )
///         .await?;
///     println!("{} bookings", bookings.len());
///     Ok(())
/// }
/// ```
pub struct Munin;

impl Munin {
    /// Create a new builder for configuring the client.
    pub fn builder() -> MuninBuilder {
        MuninBuilder::new()
    }
}

/// Builder for configuring client instances.
pub struct MuninBuilder {
    storage: Option<Arc<dyn StorageBackend>>,
    transport: Option<Arc<dyn SyncTransport>>,
    connectivity: Option<Connectivity>,
    cache: CacheConfig,
    sync: SyncConfig,
    auto_sync: bool,
}

impl MuninBuilder {
    pub fn new() -> Self {
        Self {
            storage: None,
            transport: None,
            connectivity: None,
            cache: CacheConfig::default(),
            sync: SyncConfig::default(),
            auto_sync: true,
        }
    }

    /// Durable store for the token map and sync queue. Defaults to a
    /// non-durable [`MemoryStore`] — fine for tests, wrong for an app
    /// that wants offline actions to survive a restart.
    pub fn storage(mut self, storage: Arc<dyn StorageBackend>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Transport that replays queued mutations. Required.
    pub fn transport(mut self, transport: Arc<dyn SyncTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Connectivity handle the host feeds reachability events into.
    /// Defaults to a fresh handle reporting online.
    pub fn connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = Some(connectivity);
        self
    }

    /// Read-path cache configuration.
    pub fn cache(mut self, config: CacheConfig) -> Self {
        self.cache = config;
        self
    }

    /// Sync manager configuration.
    pub fn sync(mut self, config: SyncConfig) -> Self {
        self.sync = config;
        self
    }

    /// Whether to spawn the reconnect watcher that drains the queue on
    /// every offline→online transition. Default: true.
    pub fn auto_sync(mut self, enabled: bool) -> Self {
        self.auto_sync = enabled;
        self
    }

    /// Wire everything together.
    ///
    /// Fails with [`MuninError::Configuration`] when no sync transport
    /// was provided.
    pub async fn build(self) -> Result<MuninClient> {
        let transport = self
            .transport
            .ok_or_else(|| MuninError::Configuration("no sync transport configured".into()))?;
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let connectivity = self.connectivity.unwrap_or_default();

        let coordinator = Arc::new(
            RequestCoordinator::new(&self.cache, storage.clone(), Some(connectivity.clone()))
                .await,
        );
        let queue = Arc::new(SyncQueue::load(storage).await);
        let sync = Arc::new(SyncManager::new(
            queue,
            transport,
            connectivity.clone(),
            &self.sync,
        ));
        let auto_sync = self.auto_sync.then(|| Arc::clone(&sync).watch_connectivity());

        Ok(MuninClient {
            coordinator,
            sync,
            connectivity,
            auto_sync: Mutex::new(auto_sync),
        })
    }
}

impl Default for MuninBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The assembled client: request coordinator, sync manager, and the
/// connectivity handle that feeds both.
///
/// Create via [`Munin::builder()`]; hold one per application session.
/// Dropping the client aborts the reconnect watcher.
pub struct MuninClient {
    coordinator: Arc<RequestCoordinator>,
    sync: Arc<SyncManager>,
    connectivity: Connectivity,
    auto_sync: Mutex<Option<JoinHandle<()>>>,
}

impl MuninClient {
    /// The read-path coordinator.
    pub fn coordinator(&self) -> &RequestCoordinator {
        &self.coordinator
    }

    /// The sync manager (enqueue, cancel, status).
    pub fn sync(&self) -> &SyncManager {
        &self.sync
    }

    /// The connectivity handle to feed reachability events into.
    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    /// Cache counters for the UI.
    pub fn stats(&self) -> CacheStats {
        self.coordinator.stats()
    }

    /// Buffer a write for replay; shorthand for
    /// [`sync().enqueue(..)`](SyncManager::enqueue).
    pub async fn enqueue(
        &self,
        entity: &str,
        operation: SyncOperation,
        payload: Value,
    ) -> String {
        self.sync.enqueue(entity, operation, payload).await
    }

    /// Drain the sync queue now, subject to connectivity and the rate
    /// limiter.
    pub async fn force_sync(&self) -> Result<DrainReport> {
        self.sync.drain().await
    }

    /// Evict one cache key, or everything when no key is given.
    pub async fn clear_cache(&self, key: Option<&CacheKey>) {
        self.coordinator.clear(key).await;
    }

    /// Stop the reconnect watcher, if it is running.
    pub fn stop_auto_sync(&self) {
        if let Some(handle) = self.auto_sync.lock().unwrap().take() {
            handle.abort();
        }
    }
}

impl Drop for MuninClient {
    fn drop(&mut self) {
        self.stop_auto_sync();
    }
}
