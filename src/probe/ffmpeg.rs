//! ffprobe/ffmpeg shell-out backends.
//!
//! Duration comes from container metadata only (`ffprobe -show_format`,
//! no decode); the still frame is a single decoded frame scaled to the
//! configured raster.

use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::process::Command;

use crate::config::ProbeSettings;

/// ffprobe output JSON structure (format section only)
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: FfprobeFormat,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Read the container duration in seconds
pub(crate) async fn probe_duration(settings: &ProbeSettings, media: &Path) -> Result<f64> {
    let output = Command::new(&settings.ffprobe)
        .arg("-v")
        .arg("quiet")
        .arg("-print_format")
        .arg("json")
        .arg("-show_format")
        .arg(media)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .context("Failed to run ffprobe")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("ffprobe failed: {}", stderr);
    }

    parse_duration(&String::from_utf8_lossy(&output.stdout))
}

/// Parse the duration out of ffprobe's JSON output
pub(crate) fn parse_duration(json: &str) -> Result<f64> {
    let probe: FfprobeOutput =
        serde_json::from_str(json).context("Failed to parse ffprobe JSON")?;

    let raw = probe
        .format
        .duration
        .context("No duration in container metadata")?;

    raw.trim()
        .parse::<f64>()
        .with_context(|| format!("Malformed duration value: {raw}"))
}

/// Extract one frame at `seek_seconds` as a scaled JPEG
pub(crate) async fn extract_frame(
    settings: &ProbeSettings,
    media: &Path,
    seek_seconds: f64,
) -> Result<Vec<u8>> {
    // The frame file lives only for the duration of this call
    let frame = tempfile::Builder::new()
        .prefix("vidshelf-frame-")
        .suffix(".jpg")
        .tempfile()
        .context("Failed to create frame file")?;

    let scale = format!(
        "scale={}:{}",
        settings.thumbnail_width, settings.thumbnail_height
    );

    let output = Command::new(&settings.ffmpeg)
        .arg("-y")
        .arg("-ss")
        .arg(format!("{seek_seconds:.3}"))
        .arg("-i")
        .arg(media)
        .arg("-frames:v")
        .arg("1")
        .arg("-vf")
        .arg(&scale)
        .arg("-q:v")
        .arg(settings.jpeg_quality.to_string())
        .arg("-f")
        .arg("image2")
        .arg(frame.path())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .context("Failed to run ffmpeg")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("ffmpeg failed: {}", stderr);
    }

    let bytes = tokio::fs::read(frame.path())
        .await
        .context("Failed to read extracted frame")?;

    if bytes.is_empty() {
        anyhow::bail!("ffmpeg produced an empty frame");
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        let json = r#"{"format": {"filename": "clip.mp4", "duration": "10.033000"}}"#;
        let duration = parse_duration(json).unwrap();
        assert!((duration - 10.033).abs() < 1e-9);
    }

    #[test]
    fn test_parse_duration_missing_field() {
        let json = r#"{"format": {"filename": "clip.mp4"}}"#;
        assert!(parse_duration(json).is_err());
    }

    #[test]
    fn test_parse_duration_missing_format() {
        assert!(parse_duration("{}").is_err());
    }

    #[test]
    fn test_parse_duration_garbage() {
        assert!(parse_duration("not json").is_err());
        assert!(parse_duration(r#"{"format": {"duration": "N/A"}}"#).is_err());
    }
}
