//! Scene duration planning.
//!
//! Narration audio is synthesized upstream with a trailing speech-markup break whose length must
//! match [`SCENE_BREAK_MS`]. Both the planner and [`scene_break_tag`] read the same constant so the
//! two sides cannot drift apart.

use super::scene::{Scene, SceneKind};

/// Silence appended after each body scene's narration, in milliseconds.
pub const SCENE_BREAK_MS: u32 = 400;

/// Shorter tail used after hook narration so the opening keeps its pace.
pub const HOOK_BREAK_MS: u32 = 150;

/// Used when a scene has neither narration nor a positive duration hint.
pub const FALLBACK_DURATION_SEC: f64 = 3.0;

/// Lower bound for any scene that carries narration.
pub const MIN_NARRATED_DURATION_SEC: f64 = 0.5;

pub fn scene_pause_seconds() -> f64 {
    f64::from(SCENE_BREAK_MS) / 1000.0
}

pub fn hook_pause_seconds() -> f64 {
    f64::from(HOOK_BREAK_MS) / 1000.0
}

/// SSML break tag the narration producer must append to body-scene scripts.
pub fn scene_break_tag() -> String {
    format!("<break time=\"{SCENE_BREAK_MS}ms\"/>")
}

/// Compute the playback duration of one scene.
///
/// `narration_seconds` is the probed length of the narration track, if the scene has one.
pub fn plan_scene_duration(scene: &Scene, narration_seconds: Option<f64>) -> f64 {
    let hint = scene
        .duration_hint
        .filter(|hint| hint.is_finite() && *hint > 0.0);

    let Some(length) = narration_seconds.filter(|len| len.is_finite() && *len >= 0.0) else {
        return hint.unwrap_or(FALLBACK_DURATION_SEC);
    };

    match scene.kind {
        SceneKind::Hook => MIN_NARRATED_DURATION_SEC.max(length + hook_pause_seconds()),
        SceneKind::Body => {
            let narrated = MIN_NARRATED_DURATION_SEC.max(length + scene_pause_seconds());
            hint.map_or(narrated, |hint| narrated.max(hint))
        }
    }
}
