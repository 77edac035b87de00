use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::traits::StorageBackend;
use crate::{MuninError, Result};

/// File-backed string store: one JSON object holding every key.
///
/// The file is read once at [`open`](JsonFileStore::open); reads are served
/// from the in-memory mirror and every write flushes the full snapshot.
/// Flushes go through a sibling temp file and an atomic rename, so an
/// interrupted write leaves the previous snapshot on disk. Suited to the
/// handful of small snapshots munin persists, not to bulk data.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: Mutex<HashMap<String, String>>,
}

impl JsonFileStore {
    /// Open (or create) the store file at `path`.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                MuninError::Storage(format!("corrupt store file {}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(MuninError::Storage(format!(
                    "reading {}: {e}",
                    path.display()
                )));
            }
        };
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    /// Open the store under the platform data directory
    /// (e.g. `~/.local/share/<app_name>/munin-store.json`).
    pub async fn open_default(app_name: &str) -> Result<Self> {
        let dir = dirs::data_dir()
            .ok_or_else(|| MuninError::Configuration("no platform data directory".into()))?
            .join(app_name);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| MuninError::Storage(format!("creating {}: {e}", dir.display())))?;
        Self::open(dir.join("munin-store.json")).await
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self) -> Result<()> {
        let snapshot = serde_json::to_string(&*self.values.lock().unwrap())?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, snapshot)
            .await
            .map_err(|e| MuninError::Storage(format!("writing {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| MuninError::Storage(format!("renaming into {}: {e}", self.path.display())))
    }
}

#[async_trait]
impl StorageBackend for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_owned(), value.to_owned());
        self.flush().await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.values.lock().unwrap().remove(key);
        self.flush().await
    }
}
