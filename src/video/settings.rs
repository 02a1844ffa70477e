use serde::{Deserialize, Serialize};

use super::assets::AssetRef;

/// Output aspect ratio for the rendered video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    /// Landscape 1920x1080
    #[serde(rename = "16:9")]
    Landscape,
    /// Vertical 1080x1920 for Shorts/Reels/TikTok
    #[serde(rename = "9:16")]
    #[default]
    Portrait,
}

impl AspectRatio {
    pub fn dimensions(self) -> VideoDimensions {
        match self {
            AspectRatio::Landscape => VideoDimensions::new(1920, 1080),
            AspectRatio::Portrait => VideoDimensions::new(1080, 1920),
        }
    }
}

/// Video dimensions (width x height in pixels).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoDimensions {
    pub width: u32,
    pub height: u32,
}

impl VideoDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Scale both sides by `factor`, rounded down to even values for yuv420p.
    pub fn scaled(self, factor: f64) -> Self {
        let even = |value: u32| {
            let scaled = (f64::from(value) * factor).round() as u32;
            scaled - scaled % 2
        };
        Self::new(even(self.width), even(self.height))
    }

    pub fn shorter_side(self) -> u32 {
        self.width.min(self.height)
    }
}

/// Project-wide render settings shared by every scene of one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub fps: u32,
    pub aspect_ratio: AspectRatio,
    pub include_subtitle: bool,
    pub logo_url: Option<String>,
    pub logo_width_px: u32,
    pub logo_margin_px: u32,
    pub zoom_enabled: bool,
    /// Caller-requested zoom growth per frame; halved before use.
    pub zoom_speed: f64,
    pub zoom_max: f64,
    pub hook_bgm_url: Option<String>,
    pub hook_bgm_gain_db: f64,
    pub hook_bgm_fade_sec: f64,
    pub hook_duck_db: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fps: Self::DEFAULT_FPS,
            aspect_ratio: AspectRatio::default(),
            include_subtitle: true,
            logo_url: None,
            logo_width_px: Self::DEFAULT_LOGO_WIDTH_PX,
            logo_margin_px: Self::DEFAULT_LOGO_MARGIN_PX,
            zoom_enabled: true,
            zoom_speed: Self::DEFAULT_ZOOM_SPEED,
            zoom_max: Self::DEFAULT_ZOOM_MAX,
            hook_bgm_url: None,
            hook_bgm_gain_db: Self::DEFAULT_BGM_GAIN_DB,
            hook_bgm_fade_sec: Self::DEFAULT_BGM_FADE_SEC,
            hook_duck_db: Self::DEFAULT_DUCK_DB,
        }
    }
}

/// Logo overlay parameters, present only when a logo is configured.
#[derive(Debug, Clone, PartialEq)]
pub struct LogoSettings {
    pub source: AssetRef,
    pub width_px: u32,
    pub margin_px: u32,
}

/// Zoom parameters after sanitizing caller input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomSettings {
    pub enabled: bool,
    /// Per-frame growth requested by the caller, already halved.
    pub step: f64,
    pub max: f64,
}

/// Hook background music parameters, present only when music is configured.
#[derive(Debug, Clone, PartialEq)]
pub struct MusicSettings {
    pub source: AssetRef,
    pub gain_db: f64,
    pub fade_sec: f64,
    pub duck_db: f64,
}

impl Settings {
    pub const DEFAULT_FPS: u32 = 30;
    pub const MAX_FPS: u32 = 120;
    pub const DEFAULT_LOGO_WIDTH_PX: u32 = 160;
    pub const DEFAULT_LOGO_MARGIN_PX: u32 = 40;
    pub const DEFAULT_ZOOM_SPEED: f64 = 0.001;
    pub const DEFAULT_ZOOM_MAX: f64 = 1.15;
    pub const ZOOM_MAX_LIMIT: f64 = 2.0;
    /// Caller zoom speeds proved too aggressive in practice; only half is applied.
    pub const ZOOM_SPEED_FACTOR: f64 = 0.5;
    pub const DEFAULT_BGM_GAIN_DB: f64 = -18.0;
    pub const DEFAULT_BGM_FADE_SEC: f64 = 1.0;
    pub const DEFAULT_DUCK_DB: f64 = 12.0;

    pub fn fps(&self) -> u32 {
        self.fps.clamp(1, Self::MAX_FPS)
    }

    pub fn dimensions(&self) -> VideoDimensions {
        self.aspect_ratio.dimensions()
    }

    pub fn logo(&self) -> anyhow::Result<Option<LogoSettings>> {
        let Some(reference) = non_blank(self.logo_url.as_deref()) else {
            return Ok(None);
        };
        let width_px = if self.logo_width_px == 0 {
            Self::DEFAULT_LOGO_WIDTH_PX
        } else {
            self.logo_width_px
        };
        Ok(Some(LogoSettings {
            source: AssetRef::parse(reference)?,
            width_px,
            margin_px: self.logo_margin_px,
        }))
    }

    pub fn zoom(&self) -> ZoomSettings {
        let max = if self.zoom_max.is_finite() && self.zoom_max >= 1.0 {
            self.zoom_max.min(Self::ZOOM_MAX_LIMIT)
        } else {
            Self::DEFAULT_ZOOM_MAX
        };
        let speed = if self.zoom_speed.is_finite() && self.zoom_speed >= 0.0 {
            self.zoom_speed
        } else {
            Self::DEFAULT_ZOOM_SPEED
        };
        let step = speed * Self::ZOOM_SPEED_FACTOR;
        ZoomSettings {
            enabled: self.zoom_enabled && step > 0.0 && max > 1.0,
            step,
            max,
        }
    }

    pub fn hook_music(&self) -> anyhow::Result<Option<MusicSettings>> {
        let Some(reference) = non_blank(self.hook_bgm_url.as_deref()) else {
            return Ok(None);
        };
        Ok(Some(MusicSettings {
            source: AssetRef::parse(reference)?,
            gain_db: finite_or(self.hook_bgm_gain_db, Self::DEFAULT_BGM_GAIN_DB),
            fade_sec: finite_or(self.hook_bgm_fade_sec, Self::DEFAULT_BGM_FADE_SEC).max(0.0),
            duck_db: finite_or(self.hook_duck_db, Self::DEFAULT_DUCK_DB),
        }))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn finite_or(value: f64, default: f64) -> f64 {
    if value.is_finite() { value } else { default }
}
