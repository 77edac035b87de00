//! Shipped [`StorageBackend`](crate::traits::StorageBackend) implementations.
//!
//! - [`MemoryStore`] — `HashMap` behind a mutex. Not durable; the default
//!   when no backend is configured, and the test double.
//! - [`JsonFileStore`] — one JSON object per store file, written with a
//!   temp-file-then-rename so a crash mid-write leaves the previous
//!   snapshot intact.
//!
//! Hosts with platform storage (Keychain, SharedPreferences, SQLite) are
//! expected to bring their own implementation.

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
