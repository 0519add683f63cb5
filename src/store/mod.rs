//! Durable dual-table persistence for video records and payloads.
//!
//! The store keeps two co-located tables keyed by the same id: `videos`
//! (structured metadata) and `payloads` (raw bytes). Writes that touch both
//! sides run in one transaction so a reader can never observe a record
//! without its payload or a payload without its record.
//!
//! [`VideoStore`] is the seam: [`SqliteStore`] is the production
//! implementation, [`MemoryStore`] the fake used by service tests.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::VideoRecord;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Errors surfaced by store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be opened, or a transaction failed.
    /// Fatal to the attempted operation only; already-loaded data stays
    /// usable.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The referenced id has no row
    #[error("Video not found: {0}")]
    NotFound(Uuid),
}

/// Type alias for Result with StoreError
pub type StoreResult<T> = Result<T, StoreError>;

/// Host-reported storage usage; `(0, 0)` when the host exposes none
#[derive(Debug, Clone, Copy, Default)]
pub struct StorageUsage {
    pub used: u64,
    pub total: u64,
}

/// Durable key-value storage for records and payloads.
///
/// Reads are independent (no cross-table transaction); put and delete are
/// all-or-nothing across both tables.
#[async_trait]
pub trait VideoStore: Send + Sync {
    /// Open or create the backing store. Idempotent.
    async fn initialize(&self) -> StoreResult<()>;

    /// Atomically write metadata and payload for `record.id`.
    ///
    /// If either write fails, neither is visible afterwards.
    async fn put(&self, record: VideoRecord, payload: Vec<u8>) -> StoreResult<Uuid>;

    /// Read the metadata row for `id`
    async fn get_metadata(&self, id: Uuid) -> StoreResult<VideoRecord>;

    /// Read the payload bytes for `id`
    async fn get_payload(&self, id: Uuid) -> StoreResult<Vec<u8>>;

    /// All records, in unspecified order
    async fn list_all(&self) -> StoreResult<Vec<VideoRecord>>;

    /// Whole-record overwrite keyed by `record.id`.
    ///
    /// Fails with NotFound when no prior row exists; never inserts.
    async fn update(&self, record: VideoRecord) -> StoreResult<()>;

    /// Atomically remove metadata and payload for `id`.
    ///
    /// Succeeds even when one or both sides are already absent, so a
    /// partial prior failure heals on retry.
    async fn delete(&self, id: Uuid) -> StoreResult<()>;

    /// Host-reported used/total bytes; `(0, 0)` when unsupported
    async fn usage(&self) -> StoreResult<StorageUsage>;

    /// Best-effort durable-storage grant; returns whether granted
    async fn request_persistence(&self) -> bool;
}
