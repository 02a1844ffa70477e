//! Render request documents.
//!
//! A request is a JSON object `{ "scenes": [...], "settings": {...} }`. Scene entries use the
//! field names of the upstream content generator; they are validated into [`Scene`] values
//! before any asset is touched.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::assets::AssetRef;
use super::render::error::{AssetKind, RenderError};
use super::scene::{MAX_CAPTIONS, Scene, SceneKind, Visual};
use super::settings::Settings;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderRequest {
    pub scenes: Vec<SceneSpec>,
    pub settings: Settings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SceneSpec {
    pub kind: Option<SceneKind>,
    pub ko1: Option<String>,
    pub ko2: Option<String>,
    pub ko3: Option<String>,
    pub ko4: Option<String>,
    /// Generation prompt carried by upstream tooling; not used for rendering.
    pub prompt_en: Option<String>,
    pub video_url: Option<String>,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
    pub duration_sec: Option<f64>,
}

impl SceneSpec {
    fn captions(&self) -> Vec<String> {
        [&self.ko1, &self.ko2, &self.ko3, &self.ko4]
            .into_iter()
            .flatten()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .take(MAX_CAPTIONS)
            .map(str::to_string)
            .collect()
    }

    fn has_content(&self) -> bool {
        non_blank(&self.video_url).is_some()
            || non_blank(&self.image_url).is_some()
            || non_blank(&self.audio_url).is_some()
            || !self.captions().is_empty()
    }
}

impl RenderRequest {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading render request {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("parsing render request {}", path.display()))
    }

    /// Validate scene entries. Entries with no visual, narration or caption are skipped;
    /// numbering follows the entry's position in the request.
    pub fn scenes(&self) -> Result<Vec<Scene>, RenderError> {
        let mut scenes = Vec::new();
        for (idx, spec) in self.scenes.iter().enumerate() {
            if !spec.has_content() {
                continue;
            }
            let number = idx + 1;
            let visual = if let Some(video) = non_blank(&spec.video_url) {
                Visual::Video(parse_asset(video, number, AssetKind::Video)?)
            } else if let Some(image) = non_blank(&spec.image_url) {
                Visual::Image(parse_asset(image, number, AssetKind::Image)?)
            } else {
                return Err(RenderError::MissingVisual { scene: number });
            };
            let narration = non_blank(&spec.audio_url)
                .map(|audio| parse_asset(audio, number, AssetKind::Narration))
                .transpose()?;

            scenes.push(Scene {
                number,
                kind: spec.kind.unwrap_or_default(),
                captions: spec.captions(),
                visual,
                narration,
                duration_hint: spec.duration_sec.filter(|hint| hint.is_finite() && *hint > 0.0),
            });
        }

        if scenes.is_empty() {
            return Err(RenderError::NoScenes);
        }
        Ok(scenes)
    }
}

fn parse_asset(value: &str, scene: usize, asset: AssetKind) -> Result<AssetRef, RenderError> {
    AssetRef::parse(value).map_err(|source| RenderError::Resolution {
        scene: Some(scene),
        asset,
        source,
    })
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|value| !value.is_empty())
}
