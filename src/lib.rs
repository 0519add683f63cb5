//! vidshelf - Offline personal video library core
//!
//! Durable local storage for video files plus the logic around it:
//! metadata probing, playback-state reconciliation and the cached
//! collection view. No server, no sync; everything lives in a local
//! SQLite database.
//!
//! # Architecture
//!
//! - Metadata and payload for one video always move together: writes that
//!   touch both run in a single transaction, so a reader never observes
//!   one side without the other
//! - Probing is best-effort: bytes no decoder understands still ingest,
//!   with duration and thumbnail absent
//! - The service owns the in-memory collection and reloads it from the
//!   store after every mutation
//!
//! # Modules
//!
//! - `config`: layered configuration (env, config file, defaults)
//! - `domain`: data structures (VideoRecord, IngestJob, StorageStats)
//! - `store`: dual-table persistence (SQLite, plus an in-memory fake)
//! - `probe`: duration/thumbnail derivation via ffprobe/ffmpeg
//! - `library`: orchestration, browse queries, playback gating
//! - `format`: human-readable size/duration helpers

pub mod config;
pub mod domain;
pub mod format;
pub mod library;
pub mod probe;
pub mod store;

// Re-export main types at crate root for convenience
pub use config::{load_config, IngestSettings, ProbeSettings, ResolvedConfig};
pub use domain::{IngestPhase, ProbeOutcome, SourceFile, StorageStats, VideoRecord};
pub use library::{Filter, LibraryService, SaveGate, SortKey};
pub use probe::MediaProbe;
pub use store::{MemoryStore, SqliteStore, StoreError, StoreResult, VideoStore};

/// Initialize tracing with an env filter, defaulting to `info`.
///
/// For embedders that do not bring their own subscriber; panics if a
/// global subscriber is already set.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
