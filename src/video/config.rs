use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Machine-level render settings, read from `render.toml`.
///
/// Everything here is about the host (tool locations, fonts, encoder effort); per-video
/// choices live in the request's `settings` object instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// ffmpeg binary name or path
    pub ffmpeg: String,
    /// ffprobe binary name or path
    pub ffprobe: String,
    /// Scenes rendered concurrently
    pub jobs: usize,
    /// Wall-clock limit for one render job, in seconds (0 disables it)
    pub timeout_secs: u64,
    /// Caption font file; discovered through fontconfig when unset
    pub font_path: Option<PathBuf>,
    /// Family name passed to fontconfig during discovery
    pub font_family: String,
    /// Per-asset download timeout, in seconds
    pub download_timeout_secs: u64,
    /// x264 constant rate factor (0-51)
    pub crf: u8,
    /// x264 preset
    pub preset: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            jobs: Self::DEFAULT_JOBS,
            timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
            font_path: None,
            font_family: Self::DEFAULT_FONT_FAMILY.to_string(),
            download_timeout_secs: Self::DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            crf: Self::DEFAULT_CRF,
            preset: Self::DEFAULT_PRESET.to_string(),
        }
    }
}

impl RenderConfig {
    pub const DEFAULT_JOBS: usize = 1;
    pub const MAX_JOBS: usize = 16;
    pub const DEFAULT_TIMEOUT_SECS: u64 = 900;
    pub const DEFAULT_FONT_FAMILY: &'static str = "Noto Sans CJK KR";
    pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 60;
    pub const DEFAULT_CRF: u8 = 20;
    pub const MAX_CRF: u8 = 51;
    pub const DEFAULT_PRESET: &'static str = "veryfast";

    /// Load from `explicit`, or from the default location. A missing file yields defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_from_path(path),
            None => Self::load_from_path(render_config_path()?),
        }
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading render config from {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("parsing render config {}", path.display()))?;
        Ok(config.sanitized())
    }

    fn sanitized(mut self) -> Self {
        if self.jobs == 0 {
            self.jobs = Self::DEFAULT_JOBS;
        }
        self.jobs = self.jobs.min(Self::MAX_JOBS);
        if self.crf > Self::MAX_CRF {
            self.crf = Self::DEFAULT_CRF;
        }
        if self.download_timeout_secs == 0 {
            self.download_timeout_secs = Self::DEFAULT_DOWNLOAD_TIMEOUT_SECS;
        }
        for (value, default) in [
            (&mut self.ffmpeg, "ffmpeg"),
            (&mut self.ffprobe, "ffprobe"),
            (&mut self.font_family, Self::DEFAULT_FONT_FAMILY),
            (&mut self.preset, Self::DEFAULT_PRESET),
        ] {
            if value.trim().is_empty() {
                *value = default.to_string();
            }
        }
        self
    }
}

pub fn render_config_path() -> Result<PathBuf> {
    Ok(config_dir()
        .context("Unable to determine config directory")?
        .join("shortform")
        .join("render.toml"))
}
