use serde::{Deserialize, Serialize};

use super::assets::AssetRef;

/// Maximum number of caption lines a scene can carry.
pub const MAX_CAPTIONS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SceneKind {
    /// Opening scene; its visual loops to fill the scene and it may carry music.
    Hook,
    /// Narrative scene; its visual holds the last frame instead of looping.
    #[default]
    Body,
}

impl SceneKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SceneKind::Hook => "hook",
            SceneKind::Body => "body",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualKind {
    Video,
    Image,
}

impl VisualKind {
    pub fn as_str(self) -> &'static str {
        match self {
            VisualKind::Video => "video",
            VisualKind::Image => "image",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Visual {
    Video(AssetRef),
    Image(AssetRef),
}

impl Visual {
    pub fn kind(&self) -> VisualKind {
        match self {
            Visual::Video(_) => VisualKind::Video,
            Visual::Image(_) => VisualKind::Image,
        }
    }

    pub fn source(&self) -> &AssetRef {
        match self {
            Visual::Video(source) | Visual::Image(source) => source,
        }
    }
}

/// One narrated beat of the output video.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    /// 1-based position in the render request, used in every error and event.
    pub number: usize,
    pub kind: SceneKind,
    /// Non-empty, trimmed caption lines in display order (at most [`MAX_CAPTIONS`]).
    pub captions: Vec<String>,
    pub visual: Visual,
    pub narration: Option<AssetRef>,
    pub duration_hint: Option<f64>,
}
