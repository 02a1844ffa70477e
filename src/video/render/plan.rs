use std::path::PathBuf;

use serde::Serialize;

use crate::video::scene::{SceneKind, VisualKind};
use crate::video::subtitles::CaptionWindow;

/// A scene whose assets are local files and whose duration is fixed.
#[derive(Debug, Clone, Serialize)]
pub struct ScenePlan {
    pub number: usize,
    pub kind: SceneKind,
    pub visual_kind: VisualKind,
    pub visual: PathBuf,
    pub narration: Option<PathBuf>,
    pub narration_seconds: Option<f64>,
    pub duration: f64,
    pub captions: Vec<CaptionWindow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogoOverlay {
    pub path: PathBuf,
    pub width_px: u32,
    pub margin_px: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct HookMusic {
    pub path: PathBuf,
    pub gain_db: f64,
    pub fade_sec: f64,
    pub duck_db: f64,
}

/// Everything the compiler needs for one job, in scene order.
#[derive(Debug, Clone, Serialize)]
pub struct RenderPlan {
    pub scenes: Vec<ScenePlan>,
    pub logo: Option<LogoOverlay>,
    pub music: Option<HookMusic>,
}

impl RenderPlan {
    pub fn total_duration(&self) -> f64 {
        self.scenes.iter().map(|scene| scene.duration).sum()
    }

    /// Music only plays under hook scenes.
    pub fn music_for(&self, scene: &ScenePlan) -> Option<&HookMusic> {
        match scene.kind {
            SceneKind::Hook => self.music.as_ref(),
            SceneKind::Body => None,
        }
    }
}
