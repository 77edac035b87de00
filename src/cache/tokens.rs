use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::telemetry;
use crate::traits::StorageBackend;
use crate::types::CacheKey;

/// Storage key for the persisted token snapshot.
const STORAGE_KEY: &str = "munin.revalidation_tokens";

/// Map from request key to its freshness token (ETag).
///
/// Persisted as a JSON snapshot through the host's
/// [`StorageBackend`](crate::traits::StorageBackend) and reloaded at
/// construction, so conditional requests remain effective across process
/// restarts. Persistence is best-effort: a failed write is logged and
/// counted, never surfaced — the in-memory map is the source of truth for
/// the running session.
pub struct RevalidationTokenStore {
    tokens: Mutex<HashMap<String, String>>,
    storage: Arc<dyn StorageBackend>,
}

impl RevalidationTokenStore {
    /// Reload the persisted token map, starting empty if the snapshot is
    /// missing or unreadable.
    pub async fn load(storage: Arc<dyn StorageBackend>) -> Self {
        let tokens = match storage.get(STORAGE_KEY).await {
            Ok(Some(snapshot)) => match serde_json::from_str(&snapshot) {
                Ok(map) => map,
                Err(e) => {
                    warn!(error = %e, "discarding corrupt revalidation token snapshot");
                    HashMap::new()
                }
            },
            Ok(None) => HashMap::new(),
            Err(e) => {
                warn!(error = %e, "reading revalidation token snapshot failed");
                HashMap::new()
            }
        };
        Self {
            tokens: Mutex::new(tokens),
            storage,
        }
    }

    /// Token stored for `key`, if any.
    pub fn get(&self, key: &CacheKey) -> Option<String> {
        self.tokens.lock().unwrap().get(key.as_str()).cloned()
    }

    /// Store (or replace) the token for `key` and persist the snapshot.
    pub async fn set(&self, key: &CacheKey, token: String) {
        self.tokens
            .lock()
            .unwrap()
            .insert(key.as_str().to_owned(), token);
        self.persist().await;
    }

    /// Drop the token for `key` and persist the snapshot.
    pub async fn remove(&self, key: &CacheKey) {
        let removed = self.tokens.lock().unwrap().remove(key.as_str()).is_some();
        if removed {
            self.persist().await;
        }
    }

    /// Drop every token and persist the (empty) snapshot.
    pub async fn clear(&self) {
        self.tokens.lock().unwrap().clear();
        self.persist().await;
    }

    /// Number of stored tokens.
    pub fn len(&self) -> usize {
        self.tokens.lock().unwrap().len()
    }

    /// Whether no tokens are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn persist(&self) {
        let snapshot = {
            let tokens = self.tokens.lock().unwrap();
            match serde_json::to_string(&*tokens) {
                Ok(s) => s,
                Err(e) => {
                    warn!(error = %e, "serializing revalidation tokens failed");
                    return;
                }
            }
        };
        if let Err(e) = self.storage.set(STORAGE_KEY, &snapshot).await {
            metrics::counter!(telemetry::PERSIST_FAILURES_TOTAL, "store" => "tokens").increment(1);
            warn!(error = %e, "persisting revalidation tokens failed");
        }
    }
}
