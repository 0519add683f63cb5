//! Configuration for vidshelf paths and tooling.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (VIDSHELF_HOME, VIDSHELF_FFMPEG, VIDSHELF_FFPROBE)
//! 2. Config file (.vidshelf/config.yaml)
//! 3. Defaults (~/.vidshelf)
//!
//! Config file discovery:
//! - Searches current directory and parents for .vidshelf/config.yaml
//! - Paths in config file are relative to the config file's parent directory
//!
//! Loading returns an explicit [`ResolvedConfig`] value; nothing is cached in
//! process-wide state, so tests and embedders construct their own.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub probe: Option<ProbeConfig>,
    #[serde(default)]
    pub ingest: Option<IngestConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Library state directory (relative to config file)
    pub home: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeConfig {
    pub ffmpeg: Option<String>,
    pub ffprobe: Option<String>,
    pub thumbnail_width: Option<u32>,
    pub thumbnail_height: Option<u32>,
    pub jpeg_quality: Option<u8>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngestConfig {
    pub tick_ms: Option<u64>,
    pub step_percent: Option<u8>,
    pub grace_ms: Option<u64>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to the vidshelf home (library state)
    pub home: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    /// Probe tool settings
    pub probe: ProbeSettings,
    /// Ingest progress timing
    pub ingest: IngestSettings,
}

impl ResolvedConfig {
    /// Path of the SQLite database file ($VIDSHELF_HOME/library.db)
    pub fn db_path(&self) -> PathBuf {
        self.home.join("library.db")
    }
}

/// Settings for the media probe tools.
///
/// Binary names resolve through PATH unless overridden by the config file or
/// the VIDSHELF_FFMPEG / VIDSHELF_FFPROBE environment variables.
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub ffmpeg: String,
    pub ffprobe: String,
    /// Thumbnail raster width in pixels
    pub thumbnail_width: u32,
    /// Thumbnail raster height in pixels
    pub thumbnail_height: u32,
    /// ffmpeg -q:v value (2 best .. 31 worst)
    pub jpeg_quality: u8,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            thumbnail_width: 320,
            thumbnail_height: 180,
            jpeg_quality: 5,
        }
    }
}

/// Timing for the advisory ingest progress tracker.
///
/// These drive the estimated percentages only; they have no effect on the
/// actual probe/persist work.
#[derive(Debug, Clone)]
pub struct IngestSettings {
    /// Interval between advisory progress bumps
    pub tick: Duration,
    /// Percent added per bump (capped at 95 until completion)
    pub step: u8,
    /// How long a finished entry stays visible before retirement
    pub grace: Duration,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(200),
            step: 5,
            grace: Duration::from_secs(1),
        }
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".vidshelf").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(&path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

fn resolve_probe(file: Option<&ProbeConfig>) -> ProbeSettings {
    let mut probe = ProbeSettings::default();

    if let Some(cfg) = file {
        if let Some(ref ffmpeg) = cfg.ffmpeg {
            probe.ffmpeg = ffmpeg.clone();
        }
        if let Some(ref ffprobe) = cfg.ffprobe {
            probe.ffprobe = ffprobe.clone();
        }
        if let Some(width) = cfg.thumbnail_width {
            probe.thumbnail_width = width;
        }
        if let Some(height) = cfg.thumbnail_height {
            probe.thumbnail_height = height;
        }
        if let Some(quality) = cfg.jpeg_quality {
            probe.jpeg_quality = quality;
        }
    }

    // Environment overrides beat the config file
    if let Ok(ffmpeg) = std::env::var("VIDSHELF_FFMPEG") {
        probe.ffmpeg = ffmpeg;
    }
    if let Ok(ffprobe) = std::env::var("VIDSHELF_FFPROBE") {
        probe.ffprobe = ffprobe;
    }

    probe
}

fn resolve_ingest(file: Option<&IngestConfig>) -> IngestSettings {
    let mut ingest = IngestSettings::default();

    if let Some(cfg) = file {
        if let Some(tick_ms) = cfg.tick_ms {
            ingest.tick = Duration::from_millis(tick_ms);
        }
        if let Some(step) = cfg.step_percent {
            ingest.step = step;
        }
        if let Some(grace_ms) = cfg.grace_ms {
            ingest.grace = Duration::from_millis(grace_ms);
        }
    }

    ingest
}

/// Load configuration from all sources
pub fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".vidshelf");

    let config_file = find_config_file();

    let (home, probe, ingest) = if let Some(ref config_path) = config_file {
        let config = load_config_file(config_path)?;

        let home = if let Ok(env_home) = std::env::var("VIDSHELF_HOME") {
            PathBuf::from(env_home)
        } else if let Some(ref home_path) = config.paths.home {
            // home is relative to the .vidshelf/ directory
            let vidshelf_dir = config_path.parent().unwrap_or(Path::new("."));
            resolve_path(vidshelf_dir, home_path)
        } else {
            default_home
        };

        (
            home,
            resolve_probe(config.probe.as_ref()),
            resolve_ingest(config.ingest.as_ref()),
        )
    } else {
        let home = std::env::var("VIDSHELF_HOME")
            .map(PathBuf::from)
            .unwrap_or(default_home);

        (home, resolve_probe(None), resolve_ingest(None))
    };

    Ok(ResolvedConfig {
        home,
        config_file,
        probe,
        ingest,
    })
}
