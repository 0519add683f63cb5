//! Domain types for the vidshelf library.
//!
//! This module contains the core data structures:
//! - VideoRecord: canonical metadata for one stored video
//! - SourceFile: attributes of the file handed in at ingest
//! - ProbeOutcome: best-effort derived metadata (duration, thumbnail)
//! - IngestJob: per-ingest state machine with advisory progress

pub mod ingest;
pub mod record;

// Re-export commonly used types
pub use ingest::{IngestError, IngestJob, IngestPhase};
pub use record::{ProbeOutcome, SourceFile, StorageStats, VideoRecord};
