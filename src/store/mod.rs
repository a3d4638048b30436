//! Keyed storage for onboarded devices
//!
//! The workflow hands a finished [`DeviceRecord`] to a [`DeviceStore`] and
//! keeps nothing afterwards. Two implementations exist: a JSON file for the
//! CLI and an in-memory map for tests and embedding.

pub mod file;
pub mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use crate::record::DeviceRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type DeviceId = u64;

/// A record together with the key the store assigned to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDevice {
    pub id: DeviceId,
    #[serde(flatten)]
    pub record: DeviceRecord,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store file is corrupted: {0}")]
    Json(#[from] serde_json::Error),
}

#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// Persist a record and return its new id
    async fn insert(&self, record: DeviceRecord) -> Result<DeviceId, StoreError>;

    /// All records, ordered by name ascending
    async fn list_all(&self) -> Result<Vec<StoredDevice>, StoreError>;

    /// Remove a record; `false` when no record had that id
    async fn delete_by_id(&self, id: DeviceId) -> Result<bool, StoreError>;
}

/// Order used by every `list_all` implementation
pub(crate) fn sort_by_name(devices: &mut [StoredDevice]) {
    devices.sort_by(|a, b| a.record.name.cmp(&b.record.name).then(a.id.cmp(&b.id)));
}
