mod audio;
mod concat;
mod inputs;
mod overlays;
mod video;

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};

use self::inputs::InputList;
use super::escape::format_time;
use super::graph::{FilterGraph, GraphError};
use crate::video::render::plan::{RenderPlan, ScenePlan};
use crate::video::settings::{VideoDimensions, ZoomSettings};

pub use self::concat::{compile_concat, concat_list};

pub const AUDIO_SAMPLE_RATE: u32 = 48_000;

#[derive(Debug, Clone)]
pub struct FfmpegCompileOutput {
    pub args: Vec<String>,
}

/// x264/AAC settings shared by every encoded clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeProfile {
    pub preset: String,
    pub crf: u8,
}

impl Default for EncodeProfile {
    fn default() -> Self {
        Self {
            preset: "veryfast".to_string(),
            crf: 20,
        }
    }
}

impl EncodeProfile {
    fn push_video(&self, args: &mut Vec<String>, fps: u32) {
        push_all(
            args,
            [
                "-c:v",
                "libx264",
                "-preset",
                &self.preset,
                "-crf",
                &self.crf.to_string(),
                "-pix_fmt",
                "yuv420p",
                "-r",
                &fps.to_string(),
            ],
        );
    }

    fn push_audio(&self, args: &mut Vec<String>) {
        push_all(
            args,
            [
                "-c:a",
                "aac",
                "-b:a",
                "192k",
                "-ar",
                &AUDIO_SAMPLE_RATE.to_string(),
                "-ac",
                "2",
            ],
        );
    }
}

/// Per-job knobs that stay constant across scenes.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub dimensions: VideoDimensions,
    pub fps: u32,
    pub zoom: ZoomSettings,
    /// Font used for captions; `None` disables them.
    pub font: Option<PathBuf>,
    pub subtitles: bool,
    pub encode: EncodeProfile,
}

/// Builds the two ffmpeg invocations every scene needs: normalize, then compose.
pub struct SceneCompiler<'a> {
    options: &'a CompileOptions,
    plan: &'a RenderPlan,
}

impl<'a> SceneCompiler<'a> {
    pub fn new(options: &'a CompileOptions, plan: &'a RenderPlan) -> Self {
        Self { options, plan }
    }

    /// Visual only: the scene's image or clip as a silent video of exactly its duration.
    pub fn compile_normalize(
        &self,
        scene: &ScenePlan,
        output: &Path,
    ) -> Result<FfmpegCompileOutput, GraphError> {
        let mut inputs = InputList::new();
        let mut graph = FilterGraph::new();
        self.build_visual(&mut graph, &mut inputs, scene);
        graph.map_output("outv");

        let mut args = global_args();
        inputs.push_args(&mut args);
        args.push("-filter_complex".to_string());
        args.push(graph.to_script(inputs.len())?);
        args.extend(graph.map_args());
        args.push("-an".to_string());
        self.options.encode.push_video(&mut args, self.options.fps);
        push_all(&mut args, ["-t", &format_time(scene.duration)]);
        args.push(output.to_string_lossy().into_owned());

        Ok(FfmpegCompileOutput { args })
    }

    /// Normalized base + logo + captions + mixed audio, encoded as the final scene clip.
    pub fn compile_compose(
        &self,
        scene: &ScenePlan,
        base: &Path,
        output: &Path,
    ) -> Result<FfmpegCompileOutput, GraphError> {
        let mut inputs = InputList::new();
        let mut graph = FilterGraph::new();

        let base_index = inputs.add_plain(base);
        self.build_overlays(&mut graph, &mut inputs, scene, base_index);
        self.build_audio(&mut graph, &mut inputs, scene);
        graph.map_output("outv");
        graph.map_output("outa");

        let mut args = global_args();
        inputs.push_args(&mut args);
        args.push("-filter_complex".to_string());
        args.push(graph.to_script(inputs.len())?);
        args.extend(graph.map_args());
        self.options.encode.push_video(&mut args, self.options.fps);
        self.options.encode.push_audio(&mut args);
        push_all(
            &mut args,
            [
                "-t",
                &format_time(scene.duration),
                "-movflags",
                "+faststart",
            ],
        );
        args.push(output.to_string_lossy().into_owned());

        Ok(FfmpegCompileOutput { args })
    }
}

fn global_args() -> Vec<String> {
    let mut args = Vec::new();
    push_all(
        &mut args,
        ["-hide_banner", "-nostdin", "-y", "-loglevel", "error"],
    );
    args
}

fn push_all<const N: usize>(args: &mut Vec<String>, values: [&str; N]) {
    args.extend(values.iter().map(|value| value.to_string()));
}
