//! Best-effort metadata probing of raw video bytes.
//!
//! The probe derives a still-frame thumbnail and the total duration from a
//! byte buffer. Each sub-probe fails independently and degrades to an
//! absent field; [`MediaProbe::probe`] itself never fails, so ingest
//! proceeds even for bytes no decoder understands.

mod ffmpeg;

use tracing::{debug, warn};

use crate::config::ProbeSettings;
use crate::domain::ProbeOutcome;

/// Probe for duration and thumbnail extraction
#[derive(Debug, Clone)]
pub struct MediaProbe {
    settings: ProbeSettings,
}

impl MediaProbe {
    pub fn new(settings: ProbeSettings) -> Self {
        Self { settings }
    }

    /// Probe with default tool paths and thumbnail geometry
    pub fn with_defaults() -> Self {
        Self::new(ProbeSettings::default())
    }

    /// Derive duration and thumbnail from raw video bytes.
    ///
    /// The bytes are staged to a temporary file that backs both sub-probes;
    /// the file is removed when the handle drops, on failure paths as much
    /// as on success.
    pub async fn probe(&self, bytes: &[u8]) -> ProbeOutcome {
        let staged = match tempfile::Builder::new()
            .prefix("vidshelf-probe-")
            .tempfile()
        {
            Ok(file) => file,
            Err(e) => {
                warn!("could not stage probe input: {e}");
                return ProbeOutcome::default();
            }
        };

        if let Err(e) = tokio::fs::write(staged.path(), bytes).await {
            warn!("could not stage probe input: {e}");
            return ProbeOutcome::default();
        }

        let duration_seconds =
            match ffmpeg::probe_duration(&self.settings, staged.path()).await {
                Ok(duration) => Some(duration),
                Err(e) => {
                    debug!("duration probe degraded: {e:#}");
                    None
                }
            };

        let thumbnail = match ffmpeg::extract_frame(
            &self.settings,
            staged.path(),
            seek_offset(duration_seconds),
        )
        .await
        {
            Ok(frame) => Some(frame),
            Err(e) => {
                debug!("thumbnail probe degraded: {e:#}");
                None
            }
        };

        ProbeOutcome {
            duration_seconds,
            thumbnail,
        }
    }
}

/// Seek point for the still frame: a quarter into the clip to skip dark
/// opening frames, or the start when the duration is unknown.
fn seek_offset(duration_seconds: Option<f64>) -> f64 {
    duration_seconds.map(|d| d * 0.25).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seek_offset_quarter_of_duration() {
        assert_eq!(seek_offset(Some(10.0)), 2.5);
        assert_eq!(seek_offset(Some(0.0)), 0.0);
    }

    #[test]
    fn test_seek_offset_unknown_duration() {
        assert_eq!(seek_offset(None), 0.0);
    }

    #[tokio::test]
    async fn test_probe_degrades_on_undecodable_bytes() {
        let probe = MediaProbe::with_defaults();

        let outcome = probe.probe(b"definitely not a video container").await;

        assert!(outcome.duration_seconds.is_none());
        assert!(outcome.thumbnail.is_none());
    }

    #[tokio::test]
    async fn test_probe_degrades_on_empty_input() {
        let probe = MediaProbe::with_defaults();

        let outcome = probe.probe(&[]).await;

        assert!(outcome.duration_seconds.is_none());
        assert!(outcome.thumbnail.is_none());
    }

    #[tokio::test]
    async fn test_probe_degrades_when_tools_are_missing() {
        let settings = ProbeSettings {
            ffmpeg: "/nonexistent/ffmpeg".to_string(),
            ffprobe: "/nonexistent/ffprobe".to_string(),
            ..ProbeSettings::default()
        };
        let probe = MediaProbe::new(settings);

        let outcome = probe.probe(b"bytes").await;

        assert!(outcome.duration_seconds.is_none());
        assert!(outcome.thumbnail.is_none());
    }
}
