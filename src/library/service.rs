//! Library orchestration.
//!
//! The service sequences probe → build → persist on ingest, reconciles
//! playback progress, and owns the cached in-memory collection. Every
//! mutating operation ends with a full reload from the store; local reads
//! are cheap and the working set is small, so incremental patching is not
//! worth its complexity.
//!
//! The cached collection is single-writer: external callers read it via
//! [`LibraryService::list_videos`] and route every mutation through the
//! operations here, never through the store directly.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::IngestSettings;
use crate::domain::{IngestPhase, SourceFile, StorageStats, VideoRecord};
use crate::probe::MediaProbe;
use crate::store::{StoreResult, VideoStore};

use super::progress::UploadTracker;

/// Orchestration layer over the store and probe
pub struct LibraryService {
    store: Arc<dyn VideoStore>,
    probe: MediaProbe,
    timing: IngestSettings,
    videos: RwLock<Vec<VideoRecord>>,
    stats: RwLock<StorageStats>,
    uploads: UploadTracker,
}

impl LibraryService {
    pub fn new(store: Arc<dyn VideoStore>, probe: MediaProbe) -> Self {
        Self::with_timing(store, probe, IngestSettings::default())
    }

    pub fn with_timing(
        store: Arc<dyn VideoStore>,
        probe: MediaProbe,
        timing: IngestSettings,
    ) -> Self {
        Self {
            store,
            probe,
            timing,
            videos: RwLock::new(Vec::new()),
            stats: RwLock::new(StorageStats::default()),
            uploads: UploadTracker::new(),
        }
    }

    /// Initialize the store and warm the caches.
    ///
    /// Call once at startup; store failures here leave the service usable
    /// with an empty collection.
    #[instrument(skip(self))]
    pub async fn load(&self) -> StoreResult<()> {
        self.store.initialize().await?;

        if self.store.request_persistence().await {
            debug!("durable storage granted");
        }

        self.reload_videos().await?;
        self.reload_stats().await;

        let count = self.videos.read().await.len();
        info!(videos = count, "library loaded");
        Ok(())
    }

    /// Current collection snapshot
    pub async fn list_videos(&self) -> Vec<VideoRecord> {
        self.videos.read().await.clone()
    }

    /// Latest storage usage snapshot
    pub async fn storage_stats(&self) -> StorageStats {
        *self.stats.read().await
    }

    /// Advisory percentages of in-flight ingests, keyed by transient id
    pub fn ingest_progress(&self) -> HashMap<Uuid, u8> {
        self.uploads.snapshot()
    }

    /// Phase of an in-flight ingest, if still tracked
    pub fn ingest_phase(&self, temp_id: Uuid) -> Option<IngestPhase> {
        self.uploads.phase(temp_id)
    }

    /// Ingest a video: probe the bytes, build the record, persist both
    /// rows atomically, refresh the caches.
    ///
    /// Probe failures degrade to absent metadata and never abort the
    /// ingest; only a store failure surfaces, and then no partial record
    /// is visible.
    #[instrument(skip(self, source, bytes), fields(name = %source.name, size_bytes = bytes.len()))]
    pub async fn ingest(&self, source: SourceFile, bytes: Vec<u8>) -> StoreResult<Uuid> {
        let temp_id = self.uploads.register();
        let _ticker = self
            .uploads
            .start_ticker(temp_id, self.timing.tick, self.timing.step);

        self.uploads.advance(temp_id, IngestPhase::Probing);
        let outcome = self.probe.probe(&bytes).await;

        self.uploads.advance(temp_id, IngestPhase::Persisting);
        let record = VideoRecord::build(&source, bytes.len() as u64, outcome);
        let id = record.id;

        if let Err(e) = self.store.put(record, bytes).await {
            warn!(%temp_id, "ingest failed while persisting: {e}");
            self.uploads.fail(temp_id, self.timing.grace);
            return Err(e);
        }

        self.uploads.complete(temp_id, self.timing.grace);
        self.refresh_all().await;

        info!(%id, "video ingested");
        Ok(id)
    }

    /// Read metadata and payload for playback
    pub async fn open(&self, id: Uuid) -> StoreResult<(VideoRecord, Vec<u8>)> {
        let metadata = self.store.get_metadata(id).await?;
        let payload = self.store.get_payload(id).await?;
        Ok((metadata, payload))
    }

    /// Set the favorite flag via read-modify-write
    #[instrument(skip(self))]
    pub async fn set_favorite(&self, id: Uuid, value: bool) -> StoreResult<()> {
        let mut record = self.store.get_metadata(id).await?;
        record.favorite = value;
        self.store.update(record).await?;

        self.refresh_videos().await;
        Ok(())
    }

    /// Flip the favorite flag; returns the new value
    pub async fn toggle_favorite(&self, id: Uuid) -> StoreResult<bool> {
        let record = self.store.get_metadata(id).await?;
        let value = !record.favorite;
        self.set_favorite(id, value).await?;
        Ok(value)
    }

    /// Record a playback position as a fraction of duration.
    ///
    /// The fraction is clamped to [0, 1] and `last_watched_at` is stamped.
    /// Writes are idempotent and last-write-wins; callers should throttle
    /// invocation (see [`super::playback::SaveGate`]) — the service does
    /// not rate-limit.
    #[instrument(skip(self))]
    pub async fn record_progress(&self, id: Uuid, fraction: f64) -> StoreResult<()> {
        let mut record = self.store.get_metadata(id).await?;
        record.apply_progress(fraction, Utc::now());
        self.store.update(record).await?;

        self.refresh_videos().await;
        Ok(())
    }

    /// Remove a video.
    ///
    /// The caches refresh even when the record was already absent, so a
    /// retry after a partial failure converges.
    #[instrument(skip(self))]
    pub async fn remove(&self, id: Uuid) -> StoreResult<()> {
        let result = self.store.delete(id).await;
        self.refresh_all().await;
        result
    }

    /// Remove every video in the library; returns how many were deleted
    #[instrument(skip(self))]
    pub async fn clear(&self) -> StoreResult<usize> {
        let ids: Vec<Uuid> = self.videos.read().await.iter().map(|r| r.id).collect();

        let mut removed = 0usize;
        let mut failure = None;
        for id in ids {
            match self.store.delete(id).await {
                Ok(()) => removed += 1,
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        self.refresh_all().await;

        match failure {
            Some(e) => Err(e),
            None => Ok(removed),
        }
    }

    /// Reload the collection, propagating store failures
    async fn reload_videos(&self) -> StoreResult<()> {
        let records = self.store.list_all().await?;
        *self.videos.write().await = records;
        Ok(())
    }

    /// Reload the collection, keeping the previous snapshot on failure
    async fn refresh_videos(&self) {
        if let Err(e) = self.reload_videos().await {
            warn!("collection refresh failed: {e}");
        }
    }

    async fn reload_stats(&self) {
        match self.store.usage().await {
            Ok(usage) => {
                *self.stats.write().await = StorageStats::from_usage(usage.used, usage.total);
            }
            Err(e) => warn!("storage stats refresh failed: {e}"),
        }
    }

    async fn refresh_all(&self) {
        self.refresh_videos().await;
        self.reload_stats().await;
    }
}
