//! Video records and their construction from file attributes plus probe
//! output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Attributes of the source file as handed in by the caller.
///
/// Copied verbatim into the record at ingest; the payload length supplies
/// the size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    /// Original file name, extension included
    pub name: String,

    /// MIME type as reported by the source (e.g. "video/mp4")
    pub mime_type: String,

    /// Last-modified timestamp of the source file
    pub last_modified: DateTime<Utc>,
}

impl SourceFile {
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        last_modified: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            last_modified,
        }
    }
}

/// Best-effort metadata derived from raw video bytes.
///
/// Each field fails independently; both absent is a legal outcome and never
/// blocks ingest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbeOutcome {
    /// Total duration in seconds, from container metadata
    pub duration_seconds: Option<f64>,

    /// Encoded JPEG still frame
    pub thumbnail: Option<Vec<u8>>,
}

/// Canonical metadata for one video in the library
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRecord {
    /// Unique identifier, assigned once at ingest
    pub id: Uuid,

    /// Original file name
    pub name: String,

    /// Payload size in bytes
    pub size_bytes: u64,

    /// MIME type of the source file
    pub mime_type: String,

    /// Last-modified timestamp of the source file
    pub source_last_modified: DateTime<Utc>,

    /// Duration in seconds, if probing succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,

    /// Encoded JPEG thumbnail, if probing succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<Vec<u8>>,

    /// When the video was added to the library
    pub added_at: DateTime<Utc>,

    /// When playback progress was last recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_watched_at: Option<DateTime<Utc>>,

    /// Watched fraction in [0, 1]; backward seeks are legal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watch_progress: Option<f64>,

    /// User-toggled favorite flag
    #[serde(default)]
    pub favorite: bool,
}

impl VideoRecord {
    /// Build a record from file attributes and probe output.
    ///
    /// Pure: assigns a fresh id, stamps `added_at`, copies attributes
    /// verbatim and merges whatever probe fields are present.
    pub fn build(source: &SourceFile, size_bytes: u64, probe: ProbeOutcome) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: source.name.clone(),
            size_bytes,
            mime_type: source.mime_type.clone(),
            source_last_modified: source.last_modified,
            duration_seconds: probe.duration_seconds,
            thumbnail: probe.thumbnail,
            added_at: Utc::now(),
            last_watched_at: None,
            watch_progress: None,
            favorite: false,
        }
    }

    /// Record a playback position as a fraction of total duration.
    ///
    /// The fraction is clamped to [0, 1]; `last_watched_at` is stamped on
    /// every call, including backward seeks.
    pub fn apply_progress(&mut self, fraction: f64, at: DateTime<Utc>) {
        self.watch_progress = Some(fraction.clamp(0.0, 1.0));
        self.last_watched_at = Some(at);
    }
}

/// Derived storage usage snapshot; never persisted
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StorageStats {
    /// Bytes used by the library
    pub used: u64,

    /// Total bytes the host makes available
    pub total: u64,

    /// used / total as a percentage; 0 when total is 0
    pub percentage: f64,
}

impl StorageStats {
    /// Compute stats from host-reported usage.
    pub fn from_usage(used: u64, total: u64) -> Self {
        let percentage = if total > 0 {
            (used as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        Self {
            used,
            total,
            percentage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> SourceFile {
        SourceFile::new("clip.mp4", "video/mp4", Utc::now())
    }

    #[test]
    fn test_build_copies_attributes() {
        let src = source();
        let record = VideoRecord::build(&src, 1000, ProbeOutcome::default());

        assert_eq!(record.name, "clip.mp4");
        assert_eq!(record.size_bytes, 1000);
        assert_eq!(record.mime_type, "video/mp4");
        assert_eq!(record.source_last_modified, src.last_modified);
        assert!(!record.favorite);
        assert!(record.watch_progress.is_none());
        assert!(record.last_watched_at.is_none());
    }

    #[test]
    fn test_build_merges_probe_fields() {
        let probe = ProbeOutcome {
            duration_seconds: Some(10.0),
            thumbnail: Some(vec![0xff, 0xd8, 0xff]),
        };
        let record = VideoRecord::build(&source(), 1000, probe);

        assert_eq!(record.duration_seconds, Some(10.0));
        assert_eq!(record.thumbnail.as_deref(), Some(&[0xff, 0xd8, 0xff][..]));
    }

    #[test]
    fn test_build_assigns_distinct_ids() {
        let a = VideoRecord::build(&source(), 1, ProbeOutcome::default());
        let b = VideoRecord::build(&source(), 1, ProbeOutcome::default());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_apply_progress_clamps() {
        let mut record = VideoRecord::build(&source(), 1, ProbeOutcome::default());

        record.apply_progress(-0.5, Utc::now());
        assert_eq!(record.watch_progress, Some(0.0));

        record.apply_progress(1.7, Utc::now());
        assert_eq!(record.watch_progress, Some(1.0));

        record.apply_progress(0.5, Utc::now());
        assert_eq!(record.watch_progress, Some(0.5));
        assert!(record.last_watched_at.is_some());
    }

    #[test]
    fn test_backward_seek_is_legal() {
        let mut record = VideoRecord::build(&source(), 1, ProbeOutcome::default());

        record.apply_progress(0.8, Utc::now());
        record.apply_progress(0.2, Utc::now());
        assert_eq!(record.watch_progress, Some(0.2));
    }

    #[test]
    fn test_storage_stats_percentage() {
        let stats = StorageStats::from_usage(50, 200);
        assert_eq!(stats.percentage, 25.0);
    }

    #[test]
    fn test_storage_stats_zero_total() {
        let stats = StorageStats::from_usage(50, 0);
        assert_eq!(stats.percentage, 0.0);
    }

    #[test]
    fn test_record_serialization_roundtrip() {
        let record = VideoRecord::build(&source(), 1000, ProbeOutcome::default());

        let json = serde_json::to_string(&record).unwrap();
        let parsed: VideoRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.id, record.id);
        assert_eq!(parsed.name, record.name);
        // Absent optionals stay absent through the roundtrip
        assert!(parsed.duration_seconds.is_none());
        assert!(parsed.thumbnail.is_none());
    }
}
