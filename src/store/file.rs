//! JSON file device store
//!
//! The whole store is one JSON document, rewritten on every change through
//! a temporary file and a rename so a crash never leaves half a file:
//!
//! ```json
//! {
//!   "version": 1,
//!   "nextId": 3,
//!   "devices": [
//!     { "id": 1, "name": "home", "ipAddress": "192.168.0.1", "managementPort": 80, ... }
//!   ]
//! }
//! ```

use super::{sort_by_name, DeviceId, DeviceStore, StoreError, StoredDevice};
use crate::record::DeviceRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

const STORE_FILE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreFile {
    version: u32,
    next_id: DeviceId,
    devices: Vec<StoredDevice>,
}

impl Default for StoreFile {
    fn default() -> Self {
        Self {
            version: STORE_FILE_VERSION,
            next_id: 0,
            devices: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    state: RwLock<StoreFile>,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty when the file does not exist
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let state = match fs::read_to_string(&path).await {
            Ok(content) => {
                let file: StoreFile = serde_json::from_str(&content)?;
                if file.version != STORE_FILE_VERSION {
                    tracing::warn!(
                        "Store file version mismatch: expected {}, got {}. Loading anyway.",
                        STORE_FILE_VERSION,
                        file.version
                    );
                }
                tracing::debug!("Loaded {} devices from {}", file.devices.len(), path.display());
                file
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Store file does not exist yet: {}", path.display());
                StoreFile::default()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, state: &StoreFile) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(state)?;
        let temp_path = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(json.as_bytes()).await?;
            file.sync_all().await?;
        }
        fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl DeviceStore for JsonFileStore {
    async fn insert(&self, record: DeviceRecord) -> Result<DeviceId, StoreError> {
        let mut state = self.state.write().await;
        let mut next = state.clone();
        next.next_id += 1;
        let id = next.next_id;
        next.devices.push(StoredDevice { id, record });

        self.persist(&next).await?;
        *state = next;
        tracing::debug!("Stored device {} in {}", id, self.path.display());
        Ok(id)
    }

    async fn list_all(&self) -> Result<Vec<StoredDevice>, StoreError> {
        let mut devices = self.state.read().await.devices.clone();
        sort_by_name(&mut devices);
        Ok(devices)
    }

    async fn delete_by_id(&self, id: DeviceId) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        if !state.devices.iter().any(|d| d.id == id) {
            return Ok(false);
        }

        let mut next = state.clone();
        next.devices.retain(|d| d.id != id);
        self.persist(&next).await?;
        *state = next;
        Ok(true)
    }
}
