//! Munin - request coordination and offline sync for API-backed apps
//!
//! This crate is the networking core of an offline-first client: a
//! deduplicating read cache in front of a remote API, and a durable queue
//! that buffers writes made while offline and replays them when
//! connectivity returns.
//!
//! - Concurrent identical reads collapse onto one in-flight network call.
//! - Successful reads are cached with a per-request time-to-live.
//! - The conditional variant offers a stored freshness token (ETag) so
//!   the backend can answer "not modified" instead of resending data,
//!   and falls back to stale cached data when a refresh fails.
//! - Writes enqueued offline persist across restarts and replay in FIFO
//!   order, with per-item retry bookkeeping and a rate limiter guarding
//!   the drain.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use munin::{Munin, Result, SyncItem, SyncOperation, SyncTransport};
//! use serde_json::json;
//!
//! struct ApiTransport;
//!
//! #[async_trait]
//! impl SyncTransport for ApiTransport {
//!     async fn replay(&self, _item: &SyncItem) -> Result<()> {
//!         // one HTTP call per queued item
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Munin::builder()
//!         .transport(Arc::new(ApiTransport))
//!         .build()
//!         .await?;
//!
//!     // a write while offline is buffered, not lost
//!     client.connectivity().set_online(false);
//!     client
//!         .enqueue(
//!             "booking",
//!             SyncOperation::Update,
//!             json!({"id": 42, "status": "confirmed"}),
//!         )
//!         .await;
//!
//!     // reconnecting replays the queue in the background
//!     client.connectivity().set_online(true);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod connectivity;
pub mod coordinator;
pub mod error;
pub mod storage;
pub mod sync;
pub mod telemetry;
pub mod traits;
pub mod types;

// Re-export main types at crate root
pub use connectivity::Connectivity;
pub use coordinator::{CacheStats, Munin, MuninBuilder, MuninClient, RequestCoordinator};
pub use error::{MuninError, Result};
pub use storage::{JsonFileStore, MemoryStore};
pub use traits::{StorageBackend, SyncTransport};

// Re-export configuration and data types
pub use cache::CacheConfig;
pub use sync::{RateLimiter, SyncConfig, SyncManager, SyncQueue, format_wait};
pub use types::{
    CacheEntry, CacheKey, DrainReport, FetchOptions, Revalidation, SyncItem, SyncOperation,
    SyncStatus,
};
