use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

use super::context::JobContext;
use super::error::{AssetKind, RenderError, Stage};
use super::ffmpeg::compiler::{CompileOptions, SceneCompiler, compile_concat, concat_list};
use super::ffmpeg::services::{FfmpegRunner, MediaProbe};
use super::logging::{log_event, log_event_with};
use super::plan::{HookMusic, LogoOverlay, RenderPlan, ScenePlan};
use crate::ui::prelude::{Level, OutputFormat, get_output_format};
use crate::video::assets::AssetResolver;
use crate::video::scene::{Scene, SceneKind, Visual};
use crate::video::settings::Settings;
use crate::video::subtitles::schedule_captions;
use crate::video::timing::plan_scene_duration;

type SceneSlot = Option<Result<PathBuf, RenderError>>;

/// Scene-by-scene render of one job
pub(super) struct RenderPipeline<'a> {
    context: &'a JobContext,
    runner: &'a dyn FfmpegRunner,
    probe: &'a dyn MediaProbe,
    dry_run: bool,
}

pub(super) struct RenderPipelineParams<'a> {
    pub(super) context: &'a JobContext,
    pub(super) runner: &'a dyn FfmpegRunner,
    pub(super) probe: &'a dyn MediaProbe,
    pub(super) dry_run: bool,
}

impl<'a> RenderPipeline<'a> {
    pub(super) fn new(params: RenderPipelineParams<'a>) -> Self {
        Self {
            context: params.context,
            runner: params.runner,
            probe: params.probe,
            dry_run: params.dry_run,
        }
    }

    pub(super) fn workdir(&self) -> &Path {
        self.context.workdir()
    }

    /// Resolve every asset in scene order and fix each scene's duration.
    ///
    /// Runs before any transcoding so a bad reference fails the job without side effects.
    pub(super) fn plan(
        &self,
        scenes: &[Scene],
        settings: &Settings,
        base_dir: &Path,
    ) -> Result<RenderPlan, RenderError> {
        let mut resolver = AssetResolver::new(
            &self.context.asset_dir(),
            base_dir,
            Duration::from_secs(self.context.config.download_timeout_secs),
        )
        .map_err(|err| RenderError::Io(io::Error::other(format!("{err:#}"))))?;

        let mut planned = Vec::with_capacity(scenes.len());
        for scene in scenes {
            self.context.check()?;
            planned.push(self.plan_scene(&mut resolver, scene)?);
        }

        let logo = resolve_logo(&mut resolver, settings)?;
        let music = if scenes.iter().any(|scene| scene.kind == SceneKind::Hook) {
            resolve_music(&mut resolver, settings)
        } else {
            None
        };

        Ok(RenderPlan {
            scenes: planned,
            logo,
            music,
        })
    }

    fn plan_scene(
        &self,
        resolver: &mut AssetResolver,
        scene: &Scene,
    ) -> Result<ScenePlan, RenderError> {
        let number = scene.number;
        let visual_asset = match scene.visual {
            Visual::Video(_) => AssetKind::Video,
            Visual::Image(_) => AssetKind::Image,
        };
        log_event(
            Level::Debug,
            "render.resolve",
            format!(
                "Scene {number}: resolving {visual_asset} {}",
                scene.visual.source().describe()
            ),
        );
        let visual = resolver
            .resolve(
                scene.visual.source(),
                &format!("scene_{number:02}_{visual_asset}"),
            )
            .map_err(|source| RenderError::Resolution {
                scene: Some(number),
                asset: visual_asset,
                source,
            })?;

        let (narration, narration_seconds) = match &scene.narration {
            Some(asset) => {
                let narration_error = |source| RenderError::Resolution {
                    scene: Some(number),
                    asset: AssetKind::Narration,
                    source,
                };
                let path = resolver
                    .resolve(asset, &format!("scene_{number:02}_narration"))
                    .map_err(narration_error)?;
                let seconds = match self.probe.duration(&path, &self.context.limits()) {
                    Ok(seconds) => seconds,
                    Err(err) => {
                        self.context.check()?;
                        return Err(narration_error(err));
                    }
                };
                (Some(path), Some(seconds))
            }
            None => (None, None),
        };

        let duration = plan_scene_duration(scene, narration_seconds);
        log_event(
            Level::Debug,
            "render.plan.scene",
            format!("Scene {number}: {} scene lasts {duration:.3}s", scene.kind.as_str()),
        );

        Ok(ScenePlan {
            number,
            kind: scene.kind,
            visual_kind: scene.visual.kind(),
            visual,
            narration,
            narration_seconds,
            duration,
            captions: schedule_captions(&scene.captions, duration),
        })
    }

    /// Render all scenes and join them into `staged`.
    ///
    /// Returns the measured duration of the joined file; `None` for a dry run or when it
    /// could not be probed.
    pub(super) fn execute(
        &self,
        plan: &RenderPlan,
        options: &CompileOptions,
        staged: &Path,
    ) -> Result<Option<f64>, RenderError> {
        let clips = self.render_scenes(plan, options)?;
        self.context.check()?;
        self.concatenate(&clips, staged)?;
        if self.dry_run {
            return Ok(None);
        }
        Ok(self.verify_duration(plan, options.fps, staged))
    }

    fn render_scenes(
        &self,
        plan: &RenderPlan,
        options: &CompileOptions,
    ) -> Result<Vec<PathBuf>, RenderError> {
        let compiler = SceneCompiler::new(options, plan);
        let total = plan.scenes.len();
        let workers = self.context.config.jobs.clamp(1, total.max(1));
        log_event(
            Level::Info,
            "render.scenes.start",
            format!("Rendering {total} scenes ({workers} at a time)"),
        );

        let progress = scene_progress(total as u64, self.dry_run);
        let results: Mutex<Vec<SceneSlot>> = Mutex::new((0..total).map(|_| None).collect());

        let (task_tx, task_rx) = crossbeam_channel::unbounded();
        for index in 0..total {
            let _ = task_tx.send(index);
        }
        drop(task_tx);

        thread::scope(|s| {
            for _ in 0..workers {
                let task_rx = task_rx.clone();
                let compiler = &compiler;
                let results = &results;
                let progress = &progress;
                s.spawn(move || {
                    for index in task_rx {
                        if self.context.check().is_err() {
                            break;
                        }
                        let result = self.render_scene(compiler, &plan.scenes[index]);
                        if result.is_err() {
                            // Peers stop at their next check instead of finishing doomed work.
                            self.context.cancel();
                        }
                        progress.inc(1);
                        let mut slots = results
                            .lock()
                            .unwrap_or_else(|poisoned| poisoned.into_inner());
                        slots[index] = Some(result);
                    }
                });
            }
        });
        progress.finish_and_clear();

        let slots = results
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        collect_clips(slots, self.context)
    }

    fn render_scene(
        &self,
        compiler: &SceneCompiler<'_>,
        scene: &ScenePlan,
    ) -> Result<PathBuf, RenderError> {
        let number = scene.number;
        let base = self.context.base_path(number);
        let clip = self.context.clip_path(number);

        log_event_with(
            Level::Debug,
            "render.scene.normalize",
            format!(
                "Scene {number}: normalizing {} to {:.3}s",
                scene.visual_kind.as_str(),
                scene.duration
            ),
            json!({ "scene": number, "duration": scene.duration }),
        );
        let normalize = compiler
            .compile_normalize(scene, &base)
            .map_err(|source| RenderError::Graph {
                scene: Some(number),
                stage: Stage::Normalize,
                source,
            })?;
        self.run(Some(number), Stage::Normalize, &normalize.args)?;

        log_event_with(
            Level::Debug,
            "render.scene.compose",
            format!(
                "Scene {number}: composing {} caption(s) and audio",
                scene.captions.len()
            ),
            json!({ "scene": number, "captions": scene.captions.len() }),
        );
        let compose = compiler
            .compile_compose(scene, &base, &clip)
            .map_err(|source| RenderError::Graph {
                scene: Some(number),
                stage: Stage::Compose,
                source,
            })?;
        self.run(Some(number), Stage::Compose, &compose.args)?;

        Ok(clip)
    }

    fn concatenate(&self, clips: &[PathBuf], staged: &Path) -> Result<(), RenderError> {
        if !self.dry_run
            && let Some(missing) = clips.iter().find(|clip| !clip.is_file())
        {
            return Err(RenderError::MissingClip {
                path: missing.clone(),
            });
        }

        let list = self.context.workdir().join("clips.txt");
        fs::write(&list, concat_list(clips))?;
        log_event(
            Level::Debug,
            "render.concat",
            format!("Joining {} clips", clips.len()),
        );
        let args = compile_concat(&list, staged).args;
        self.run(None, Stage::Concatenate, &args)
    }

    fn verify_duration(&self, plan: &RenderPlan, fps: u32, staged: &Path) -> Option<f64> {
        let expected = plan.total_duration();
        let tolerance = plan.scenes.len() as f64 / f64::from(fps.max(1));
        match self.probe.duration(staged, &self.context.limits()) {
            Ok(actual) => {
                if (actual - expected).abs() > tolerance {
                    log_event_with(
                        Level::Warn,
                        "render.verify.drift",
                        format!(
                            "Rendered duration {actual:.3}s differs from planned {expected:.3}s by more than {tolerance:.3}s"
                        ),
                        json!({ "expected": expected, "actual": actual, "tolerance": tolerance }),
                    );
                }
                Some(actual)
            }
            Err(err) => {
                log_event(
                    Level::Warn,
                    "render.verify.failed",
                    format!("Could not probe the rendered video: {err:#}"),
                );
                None
            }
        }
    }

    fn run(&self, scene: Option<usize>, stage: Stage, args: &[String]) -> Result<(), RenderError> {
        self.runner
            .run(args, &self.context.limits())
            .map_err(|error| {
                RenderError::from_run(scene, stage, error, self.context.config.timeout_secs)
            })
    }
}

fn resolve_logo(
    resolver: &mut AssetResolver,
    settings: &Settings,
) -> Result<Option<LogoOverlay>, RenderError> {
    let logo_error = |source| RenderError::Resolution {
        scene: None,
        asset: AssetKind::Logo,
        source,
    };
    let Some(logo) = settings.logo().map_err(logo_error)? else {
        return Ok(None);
    };
    let path = resolver.resolve(&logo.source, "logo").map_err(logo_error)?;
    Ok(Some(LogoOverlay {
        path,
        width_px: logo.width_px,
        margin_px: logo.margin_px,
    }))
}

/// Music is optional polish: when it cannot be used the hook keeps its narration alone.
fn resolve_music(resolver: &mut AssetResolver, settings: &Settings) -> Option<HookMusic> {
    let resolved = settings.hook_music().and_then(|music| {
        music
            .map(|music| {
                resolver
                    .resolve(&music.source, "hook_music")
                    .map(|path| HookMusic {
                        path,
                        gain_db: music.gain_db,
                        fade_sec: music.fade_sec,
                        duck_db: music.duck_db,
                    })
            })
            .transpose()
    });
    match resolved {
        Ok(music) => music,
        Err(source) => {
            let err = RenderError::Resolution {
                scene: None,
                asset: AssetKind::Music,
                source,
            };
            log_event_with(
                Level::Warn,
                "render.music.unavailable",
                format!(
                    "{}; continuing with narration only",
                    err.full_message()
                ),
                err.payload(),
            );
            None
        }
    }
}

/// Clips in scene order, or the error to report: a real failure from the lowest-numbered
/// scene wins over the cancellations it caused.
fn collect_clips(slots: Vec<SceneSlot>, context: &JobContext) -> Result<Vec<PathBuf>, RenderError> {
    let mut clips = Vec::with_capacity(slots.len());
    let mut interruption = None;
    let mut skipped = false;

    for slot in slots {
        match slot {
            Some(Ok(clip)) => clips.push(clip),
            Some(Err(err @ (RenderError::Cancelled | RenderError::TimedOut(_)))) => {
                interruption.get_or_insert(err);
            }
            Some(Err(err)) => return Err(err),
            None => skipped = true,
        }
    }

    if let Some(err) = interruption {
        return Err(err);
    }
    if skipped {
        context.check()?;
        return Err(RenderError::Cancelled);
    }
    Ok(clips)
}

fn scene_progress(total: u64, hidden: bool) -> ProgressBar {
    if hidden || get_output_format() == OutputFormat::Json {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(total);
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} scenes",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("█▉▊▋▌▍▎▏ ");
    bar.set_style(style);
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}
