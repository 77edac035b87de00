//! Core types shared across the crate.

mod entry;
mod key;
mod options;
mod sync;

pub use entry::{CacheEntry, Revalidation};
pub use key::CacheKey;
pub use options::FetchOptions;
pub use sync::{DrainReport, SyncItem, SyncOperation, SyncStatus};

pub(crate) use sync::unix_millis;
