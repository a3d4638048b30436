//! In-memory device store; nothing survives the process

use super::{sort_by_name, DeviceId, DeviceStore, StoreError, StoredDevice};
use crate::record::DeviceRecord;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Inner {
    next_id: DeviceId,
    devices: BTreeMap<DeviceId, DeviceRecord>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeviceStore for MemoryStore {
    async fn insert(&self, record: DeviceRecord) -> Result<DeviceId, StoreError> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let id = inner.next_id;
        inner.devices.insert(id, record);
        Ok(id)
    }

    async fn list_all(&self) -> Result<Vec<StoredDevice>, StoreError> {
        let inner = self.inner.read().await;
        let mut devices: Vec<_> = inner
            .devices
            .iter()
            .map(|(id, record)| StoredDevice {
                id: *id,
                record: record.clone(),
            })
            .collect();
        sort_by_name(&mut devices);
        Ok(devices)
    }

    async fn delete_by_id(&self, id: DeviceId) -> Result<bool, StoreError> {
        Ok(self.inner.write().await.devices.remove(&id).is_some())
    }
}
