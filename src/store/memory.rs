//! In-memory store fake for tests.
//!
//! Mirrors the dual-table contract of the SQLite store without touching the
//! filesystem, and can inject a one-shot write failure to exercise the
//! all-or-nothing and failure-surfacing paths of callers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::VideoRecord;

use super::{StorageUsage, StoreError, StoreResult, VideoStore};

#[derive(Default)]
struct Inner {
    records: HashMap<Uuid, VideoRecord>,
    payloads: HashMap<Uuid, Vec<u8>>,
}

/// In-memory dual-table store
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    fail_next_write: AtomicBool,
    usage: Mutex<StorageUsage>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a one-shot failure: the next write operation (put, update or
    /// delete) fails with `Unavailable` before touching any state.
    pub fn fail_next_write(&self) {
        self.fail_next_write.store(true, Ordering::SeqCst);
    }

    /// Set the values reported by [`VideoStore::usage`]
    pub fn set_usage(&self, used: u64, total: u64) {
        if let Ok(mut usage) = self.usage.lock() {
            *usage = StorageUsage { used, total };
        }
    }

    fn take_failure(&self) -> bool {
        self.fail_next_write.swap(false, Ordering::SeqCst)
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".to_string()))
    }
}

#[async_trait]
impl VideoStore for MemoryStore {
    async fn initialize(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn put(&self, record: VideoRecord, payload: Vec<u8>) -> StoreResult<Uuid> {
        if self.take_failure() {
            return Err(StoreError::Unavailable("injected write failure".to_string()));
        }

        let mut inner = self.lock()?;
        let id = record.id;
        // Both sides land under one lock; a reader sees both or neither
        inner.records.insert(id, record);
        inner.payloads.insert(id, payload);
        Ok(id)
    }

    async fn get_metadata(&self, id: Uuid) -> StoreResult<VideoRecord> {
        self.lock()?
            .records
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn get_payload(&self, id: Uuid) -> StoreResult<Vec<u8>> {
        self.lock()?
            .payloads
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn list_all(&self) -> StoreResult<Vec<VideoRecord>> {
        Ok(self.lock()?.records.values().cloned().collect())
    }

    async fn update(&self, record: VideoRecord) -> StoreResult<()> {
        if self.take_failure() {
            return Err(StoreError::Unavailable("injected write failure".to_string()));
        }

        let mut inner = self.lock()?;
        match inner.records.get_mut(&record.id) {
            Some(existing) => {
                *existing = record;
                Ok(())
            }
            None => Err(StoreError::NotFound(record.id)),
        }
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        if self.take_failure() {
            return Err(StoreError::Unavailable("injected write failure".to_string()));
        }

        let mut inner = self.lock()?;
        inner.records.remove(&id);
        inner.payloads.remove(&id);
        Ok(())
    }

    async fn usage(&self) -> StoreResult<StorageUsage> {
        self.usage
            .lock()
            .map(|usage| *usage)
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".to_string()))
    }

    async fn request_persistence(&self) -> bool {
        false
    }
}
