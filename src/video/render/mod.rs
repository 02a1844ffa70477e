mod context;
pub mod error;
mod ffmpeg;
pub(crate) mod logging;
mod output;
pub mod paths;
mod pipeline;
mod plan;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use serde_json::json;

use crate::ui::prelude::{Level, OutputFormat, get_output_format};

use self::context::JobContext;
use self::error::RenderError;
use self::ffmpeg::compiler::{CompileOptions, EncodeProfile};
use self::ffmpeg::services::{
    CancelToken, DryRunRunner, FfmpegRunner, FfprobeProbe, SystemFfmpegRunner,
};
use self::logging::{log_event, log_event_with};
use self::output::{finalize_output, prepare_output_destination};
use self::pipeline::{RenderPipeline, RenderPipelineParams};
use self::plan::RenderPlan;
use super::cli::{PlanArgs, RenderArgs};
use super::config::RenderConfig;
use super::fonts::discover_font;
use super::request::RenderRequest;
use super::scene::Scene;
use super::support::ffmpeg::locate_tool;
use super::support::utils::{canonicalize_existing, format_seconds};
use super::timing::scene_break_tag;

/// A request file with its validated scenes.
struct LoadedRequest {
    path: PathBuf,
    dir: PathBuf,
    request: RenderRequest,
    scenes: Vec<Scene>,
}

impl LoadedRequest {
    fn load(path: &Path) -> Result<Self> {
        let path = canonicalize_existing(path)?;
        let dir = path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        let request = RenderRequest::load(&path)?;
        let scenes = request.scenes()?;
        Ok(Self {
            path,
            dir,
            request,
            scenes,
        })
    }

    fn has_narration(&self) -> bool {
        self.scenes.iter().any(|scene| scene.narration.is_some())
    }

    fn has_captions(&self) -> bool {
        self.scenes.iter().any(|scene| !scene.captions.is_empty())
    }
}

fn load_config(explicit: Option<&Path>) -> Result<RenderConfig> {
    Ok(RenderConfig::load(explicit).map_err(RenderError::Config)?)
}

/// Resolved ffprobe, looked up only when something will actually be probed.
fn media_probe(config: &RenderConfig, required: bool) -> Result<FfprobeProbe> {
    let program = if required {
        locate_tool(&config.ffprobe)?
    } else {
        PathBuf::from(&config.ffprobe)
    };
    Ok(FfprobeProbe::new(program))
}

fn install_interrupt_handler(cancel: &CancelToken) {
    let token = cancel.clone();
    if let Err(err) = ctrlc::set_handler(move || token.cancel()) {
        log_event(
            Level::Debug,
            "render.interrupt.unavailable",
            format!("Could not install Ctrl-C handler: {err}"),
        );
    }
}

pub fn handle_render(args: RenderArgs, config_path: Option<&Path>) -> Result<Option<PathBuf>> {
    let mut config = load_config(config_path)?;
    if let Some(jobs) = args.jobs {
        config.jobs = jobs.clamp(1, RenderConfig::MAX_JOBS);
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }

    log_event(
        Level::Info,
        "render.start",
        format!("Preparing render of {}", args.request.display()),
    );
    let loaded = LoadedRequest::load(&args.request)?;

    let dry_runner = DryRunRunner::new(config.ffmpeg.clone());
    let system_runner;
    let runner: &dyn FfmpegRunner = if args.dry_run {
        &dry_runner
    } else {
        system_runner = SystemFfmpegRunner::new(locate_tool(&config.ffmpeg)?);
        &system_runner
    };
    let probe = media_probe(&config, !args.dry_run || loaded.has_narration())?;

    let output_path =
        paths::resolve_output_path(args.out_file.as_ref(), &loaded.path, &loaded.dir)?;
    if !args.dry_run {
        prepare_output_destination(&output_path, args.force, &loaded.path)?;
    }

    let cancel = CancelToken::new();
    install_interrupt_handler(&cancel);

    let settings = &loaded.request.settings;
    let mut context = JobContext::new(config, cancel, args.keep_workdir)?;
    if settings.include_subtitle && loaded.has_captions() {
        context.font = discover_font(
            context.config.font_path.as_deref(),
            &context.config.font_family,
        );
        if context.font.is_none() {
            log_event(
                Level::Warn,
                "render.font.unavailable",
                "No caption font found; rendering without captions",
            );
        }
    }

    let options = CompileOptions {
        dimensions: settings.dimensions(),
        fps: settings.fps(),
        zoom: settings.zoom(),
        font: context.font.clone(),
        subtitles: settings.include_subtitle,
        encode: EncodeProfile {
            preset: context.config.preset.clone(),
            crf: context.config.crf,
        },
    };

    let pipeline = RenderPipeline::new(RenderPipelineParams {
        context: &context,
        runner,
        probe: &probe,
        dry_run: args.dry_run,
    });
    let rendered = run_job(&pipeline, &loaded, &options, &output_path, args.dry_run);
    if args.dry_run && rendered.is_ok() {
        log_event(
            Level::Info,
            "render.dry_run",
            format!(
                "Dry run completed - {} ffmpeg command(s) printed above",
                dry_runner.commands_printed()
            ),
        );
    }

    drop(pipeline);
    if let Some(kept) = context.finish() {
        log_event(
            Level::Info,
            "render.workdir.kept",
            format!("Intermediate files kept in {}", kept.display()),
        );
    }

    rendered
}

fn run_job(
    pipeline: &RenderPipeline<'_>,
    loaded: &LoadedRequest,
    options: &CompileOptions,
    output_path: &Path,
    dry_run: bool,
) -> Result<Option<PathBuf>> {
    log_event(
        Level::Info,
        "render.resolve",
        format!("Resolving assets for {} scene(s)", loaded.scenes.len()),
    );
    let plan = pipeline.plan(&loaded.scenes, &loaded.request.settings, &loaded.dir)?;

    let extension = output_path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("mp4");
    let staged = pipeline.workdir().join(format!("final.{extension}"));
    let measured = pipeline.execute(&plan, options, &staged)?;

    let rendered = if dry_run {
        None
    } else {
        finalize_output(&staged, output_path)?;
        log_event_with(
            Level::Success,
            "render.success",
            format!(
                "Rendered {} scene(s), {} to {}",
                plan.scenes.len(),
                format_seconds(measured.unwrap_or_else(|| plan.total_duration())),
                output_path.display()
            ),
            json!({
                "output": output_path,
                "scenes": plan.scenes.len(),
                "plannedDuration": plan.total_duration(),
                "duration": measured,
            }),
        );
        Some(output_path.to_path_buf())
    };

    Ok(rendered)
}

pub fn handle_plan(args: PlanArgs, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let loaded = LoadedRequest::load(&args.request)?;
    let probe = media_probe(&config, loaded.has_narration())?;
    let runner = DryRunRunner::new(config.ffmpeg.clone());
    let context = JobContext::new(config, CancelToken::new(), false)?;

    let pipeline = RenderPipeline::new(RenderPipelineParams {
        context: &context,
        runner: &runner,
        probe: &probe,
        dry_run: true,
    });
    let plan = pipeline
        .plan(&loaded.scenes, &loaded.request.settings, &loaded.dir)
        .with_context(|| format!("planning {}", loaded.path.display()))?;

    match get_output_format() {
        OutputFormat::Json => {
            log_event_with(
                Level::Info,
                "plan.result",
                format!(
                    "{} scene(s), {}",
                    plan.scenes.len(),
                    format_seconds(plan.total_duration())
                ),
                json!({ "plan": plan, "totalDuration": plan.total_duration() }),
            );
        }
        OutputFormat::Text => {
            println!("{}", plan_table(&plan));
            println!("Total duration: {}", format_seconds(plan.total_duration()));
        }
    }
    Ok(())
}

pub fn handle_break_tag() -> Result<()> {
    match get_output_format() {
        OutputFormat::Json => log_event_with(
            Level::Info,
            "break_tag",
            scene_break_tag(),
            json!({ "tag": scene_break_tag() }),
        ),
        OutputFormat::Text => println!("{}", scene_break_tag()),
    }
    Ok(())
}

fn plan_table(plan: &RenderPlan) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "Scene",
            "Kind",
            "Visual",
            "Narration",
            "Duration",
            "Captions",
        ]);

    for scene in &plan.scenes {
        let narration = scene
            .narration_seconds
            .map(format_seconds)
            .unwrap_or_else(|| "-".to_string());
        let captions = if scene.captions.is_empty() {
            "-".to_string()
        } else {
            scene
                .captions
                .iter()
                .map(|window| {
                    format!(
                        "{:.2}-{:.2} {}",
                        window.start, window.end, window.text
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        };
        table.add_row(vec![
            Cell::new(scene.number).set_alignment(CellAlignment::Right),
            Cell::new(scene.kind.as_str()),
            Cell::new(scene.visual_kind.as_str()),
            Cell::new(narration).set_alignment(CellAlignment::Right),
            Cell::new(format_seconds(scene.duration)).set_alignment(CellAlignment::Right),
            Cell::new(captions),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::render::plan::ScenePlan;
    use crate::video::scene::{SceneKind, VisualKind};
    use crate::video::subtitles::schedule_captions;

    #[test]
    fn plan_table_lists_every_scene() {
        let plan = RenderPlan {
            scenes: vec![
                ScenePlan {
                    number: 1,
                    kind: SceneKind::Hook,
                    visual_kind: VisualKind::Video,
                    visual: PathBuf::from("hook.mp4"),
                    narration: Some(PathBuf::from("n.mp3")),
                    narration_seconds: Some(2.5),
                    duration: 2.8,
                    captions: schedule_captions(&["첫 줄"], 2.8),
                },
                ScenePlan {
                    number: 3,
                    kind: SceneKind::Body,
                    visual_kind: VisualKind::Image,
                    visual: PathBuf::from("b.png"),
                    narration: None,
                    narration_seconds: None,
                    duration: 3.0,
                    captions: Vec::new(),
                },
            ],
            logo: None,
            music: None,
        };

        let rendered = plan_table(&plan).to_string();

        assert!(rendered.contains("hook"));
        assert!(rendered.contains("image"));
        assert!(rendered.contains("2.500s"));
        assert!(rendered.contains("0.00-2.80 첫 줄"));
    }
}
