use std::error::Error as _;
use std::fmt;
use std::path::PathBuf;

use serde_json::{Value, json};
use thiserror::Error;

use super::ffmpeg::graph::GraphError;
use super::ffmpeg::services::RunError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Image,
    Video,
    Narration,
    Logo,
    Music,
}

impl AssetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AssetKind::Image => "image",
            AssetKind::Video => "video",
            AssetKind::Narration => "narration",
            AssetKind::Logo => "logo",
            AssetKind::Music => "music",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Normalize,
    Compose,
    Concatenate,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Normalize => "normalize",
            Stage::Compose => "compose",
            Stage::Concatenate => "concatenate",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Render request contains no scenes")]
    NoScenes,

    #[error("Scene {scene} has neither a video nor an image")]
    MissingVisual { scene: usize },

    #[error("{}Failed to resolve {asset}", scene_prefix(.scene))]
    Resolution {
        scene: Option<usize>,
        asset: AssetKind,
        #[source]
        source: anyhow::Error,
    },

    #[error("{}Failed to build {stage} filter graph", scene_prefix(.scene))]
    Graph {
        scene: Option<usize>,
        stage: Stage,
        #[source]
        source: GraphError,
    },

    #[error("{}{stage} step failed", scene_prefix(.scene))]
    Transcode {
        scene: Option<usize>,
        stage: Stage,
        #[source]
        source: RunError,
    },

    #[error("concatenate step failed: scene clip {} is missing", .path.display())]
    MissingClip { path: PathBuf },

    #[error("Render cancelled")]
    Cancelled,

    #[error("Render exceeded its {0}s time limit")]
    TimedOut(u64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error")]
    Config(#[source] anyhow::Error),
}

fn scene_prefix(scene: &Option<usize>) -> String {
    scene.map_or_else(String::new, |scene| format!("Scene {scene}: "))
}

impl RenderError {
    pub fn code(&self) -> &'static str {
        match self {
            RenderError::NoScenes => "no_scenes",
            RenderError::MissingVisual { .. } => "missing_visual",
            RenderError::Resolution { .. } => "asset_resolution",
            RenderError::Graph { .. } => "filter_graph",
            RenderError::Transcode { .. } => "transcode",
            RenderError::MissingClip { .. } => "missing_clip",
            RenderError::Cancelled => "cancelled",
            RenderError::TimedOut(_) => "timed_out",
            RenderError::Io(_) => "io",
            RenderError::Config(_) => "config",
        }
    }

    /// Whether the request itself was unusable, as opposed to a failure while rendering.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            RenderError::NoScenes | RenderError::MissingVisual { .. }
        )
    }

    pub fn scene(&self) -> Option<usize> {
        match self {
            RenderError::MissingVisual { scene } => Some(*scene),
            RenderError::Resolution { scene, .. }
            | RenderError::Graph { scene, .. }
            | RenderError::Transcode { scene, .. } => *scene,
            _ => None,
        }
    }

    /// Pipeline stage the error was raised in, when it belongs to one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            RenderError::Graph { stage, .. } | RenderError::Transcode { stage, .. } => Some(*stage),
            RenderError::MissingClip { .. } => Some(Stage::Concatenate),
            _ => None,
        }
    }

    /// Map a runner interruption onto the job-level error it stands for.
    pub fn from_run(scene: Option<usize>, stage: Stage, error: RunError, timeout_secs: u64) -> Self {
        match error {
            RunError::Cancelled { .. } => RenderError::Cancelled,
            RunError::TimedOut { .. } => RenderError::TimedOut(timeout_secs),
            source => RenderError::Transcode {
                scene,
                stage,
                source,
            },
        }
    }

    /// Structured error payload for machine consumers.
    pub fn payload(&self) -> Value {
        let mut payload = json!({
            "error": self.code(),
            "message": self.full_message(),
        });
        if let Some(scene) = self.scene() {
            payload["scene"] = json!(scene);
        }
        if let Some(stage) = self.stage() {
            payload["stage"] = json!(stage.as_str());
        }
        match self {
            RenderError::Resolution { asset, .. } => {
                payload["asset"] = json!(asset.as_str());
            }
            RenderError::MissingClip { path } => {
                payload["path"] = json!(path);
            }
            RenderError::Transcode { source, .. } => {
                if let RunError::Failed {
                    code, diagnostics, ..
                } = source
                {
                    payload["exitCode"] = json!(code);
                    payload["diagnostics"] = json!(diagnostics);
                }
            }
            _ => {}
        }
        payload
    }

    /// Display text followed by every source, joined with `: `.
    pub fn full_message(&self) -> String {
        let mut message = self.to_string();
        let mut source = self.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        message
    }
}
