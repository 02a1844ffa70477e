use std::path::{Path, PathBuf};

use super::audio::{NARRATION_FADE_SEC, clamp_fade, duck_ratio};
use super::video::effective_zoom_step;
use super::{CompileOptions, EncodeProfile, SceneCompiler, compile_concat, concat_list};
use crate::video::render::plan::{HookMusic, LogoOverlay, RenderPlan, ScenePlan};
use crate::video::scene::{SceneKind, VisualKind};
use crate::video::settings::{AspectRatio, Settings, ZoomSettings};
use crate::video::subtitles::schedule_captions;

fn options() -> CompileOptions {
    CompileOptions {
        dimensions: AspectRatio::Portrait.dimensions(),
        fps: 30,
        zoom: Settings::default().zoom(),
        font: Some(PathBuf::from("/fonts/NotoSansCJK-Bold.ttc")),
        subtitles: true,
        encode: EncodeProfile::default(),
    }
}

fn scene(kind: SceneKind, visual_kind: VisualKind, duration: f64) -> ScenePlan {
    ScenePlan {
        number: 1,
        kind,
        visual_kind,
        visual: PathBuf::from(match visual_kind {
            VisualKind::Image => "/job/assets/scene_01_image.png",
            VisualKind::Video => "/job/assets/scene_01_video.mp4",
        }),
        narration: Some(PathBuf::from("/job/assets/scene_01_narration.mp3")),
        narration_seconds: Some(duration - 0.4),
        duration,
        captions: Vec::new(),
    }
}

fn plan(scene: ScenePlan) -> RenderPlan {
    RenderPlan {
        scenes: vec![scene],
        logo: None,
        music: None,
    }
}

fn arg_after<'a>(args: &'a [String], flag: &str) -> &'a str {
    let idx = args
        .iter()
        .position(|arg| arg == flag)
        .unwrap_or_else(|| panic!("missing {flag} in {args:?}"));
    &args[idx + 1]
}

fn filter_complex(args: &[String]) -> &str {
    arg_after(args, "-filter_complex")
}

fn normalize(options: &CompileOptions, plan: &RenderPlan) -> Vec<String> {
    SceneCompiler::new(options, plan)
        .compile_normalize(&plan.scenes[0], Path::new("/job/scene_01_base.mp4"))
        .unwrap()
        .args
}

fn compose(options: &CompileOptions, plan: &RenderPlan) -> Vec<String> {
    SceneCompiler::new(options, plan)
        .compile_compose(
            &plan.scenes[0],
            Path::new("/job/scene_01_base.mp4"),
            Path::new("/job/scene_01.mp4"),
        )
        .unwrap()
        .args
}

#[test]
fn zoom_step_never_overshoots_the_cap() {
    let zoom = ZoomSettings {
        enabled: true,
        step: 0.01,
        max: 1.15,
    };
    for (duration, fps) in [(3.0, 30), (4.4, 30), (0.5, 24), (12.345, 60), (60.0, 120)] {
        let step = effective_zoom_step(&zoom, duration, fps);
        let frames = (duration * f64::from(fps)).ceil();
        assert!(step > 0.0);
        assert!(1.0 + step * frames <= zoom.max + 1e-12, "{duration}s @ {fps}");
    }
}

#[test]
fn gentle_zoom_step_is_kept() {
    let zoom = Settings::default().zoom();
    let step = effective_zoom_step(&zoom, 3.0, 30);
    assert!((step - Settings::DEFAULT_ZOOM_SPEED * Settings::ZOOM_SPEED_FACTOR).abs() < 1e-9);
}

#[test]
fn disabled_zoom_has_no_step() {
    let zoom = ZoomSettings {
        enabled: false,
        step: 0.01,
        max: 1.15,
    };
    assert_eq!(effective_zoom_step(&zoom, 3.0, 30), 0.0);
}

#[test]
fn still_image_is_zoomed_on_oversampled_canvas() {
    let options = options();
    let plan = plan(scene(SceneKind::Hook, VisualKind::Image, 3.0));
    let args = normalize(&options, &plan);

    assert_eq!(arg_after(&args, "-loop"), "1");
    assert_eq!(arg_after(&args, "-framerate"), "30");
    let graph = filter_complex(&args);
    assert!(graph.starts_with("[0:v]scale=1620:2880:force_original_aspect_ratio=increase"));
    assert!(graph.contains("zoompan=z=min(1+0.000500000*on\\,1.15)"));
    assert!(graph.contains("s=1620x2880:fps=30"));
    assert!(graph.contains("scale=1080:1920:flags=lanczos"));
    assert!(graph.contains("trim=duration=3.000000"));
    assert!(graph.ends_with("[outv]"));
    assert_eq!(arg_after(&args, "-t"), "3.000000");
    assert_eq!(args.last().unwrap(), "/job/scene_01_base.mp4");
    assert!(args.contains(&"-an".to_string()));
}

#[test]
fn still_image_without_zoom_is_scaled_directly() {
    let mut options = options();
    options.zoom.enabled = false;
    let plan = plan(scene(SceneKind::Body, VisualKind::Image, 3.0));
    let graph = filter_complex(&normalize(&options, &plan)).to_string();

    assert!(!graph.contains("zoompan"));
    assert!(graph.starts_with("[0:v]scale=1080:1920:force_original_aspect_ratio=increase"));
    assert!(graph.contains("fps=30"));
}

#[test]
fn hook_clip_loops_and_body_clip_holds_last_frame() {
    let options = options();

    let hook = plan(scene(SceneKind::Hook, VisualKind::Video, 5.0));
    let hook_args = normalize(&options, &hook);
    assert_eq!(arg_after(&hook_args, "-stream_loop"), "-1");
    assert!(!filter_complex(&hook_args).contains("tpad"));

    let body = plan(scene(SceneKind::Body, VisualKind::Video, 5.0));
    let body_args = normalize(&options, &body);
    assert!(!body_args.contains(&"-stream_loop".to_string()));
    assert!(
        filter_complex(&body_args).contains("tpad=stop_mode=clone:stop_duration=5.000000")
    );
}

#[test]
fn compose_without_logo_or_music_passes_narration_through() {
    let options = options();
    let plan = plan(scene(SceneKind::Body, VisualKind::Image, 4.4));
    let args = compose(&options, &plan);
    let graph = filter_complex(&args);

    assert!(graph.starts_with("[0:v]null[outv]"));
    assert!(graph.contains("[1:a]aresample=48000:async=1"));
    assert!(graph.contains("afade=t=out:st=4.150000:d=0.250000"));
    assert!(graph.ends_with("[outa]"));
    assert!(!graph.contains("sidechaincompress"));
    assert!(!graph.contains("amix"));
    assert_eq!(args.last().unwrap(), "/job/scene_01.mp4");
    assert_eq!(arg_after(&args, "-movflags"), "+faststart");
}

#[test]
fn narration_fade_fits_short_scenes() {
    assert_eq!(clamp_fade(NARRATION_FADE_SEC, 0.3), 0.15);
    assert_eq!(clamp_fade(NARRATION_FADE_SEC, 3.0), NARRATION_FADE_SEC);
    assert_eq!(clamp_fade(-1.0, 3.0), 0.0);
}

#[test]
fn missing_narration_becomes_silence_of_scene_length() {
    let options = options();
    let mut scene = scene(SceneKind::Hook, VisualKind::Image, 3.0);
    scene.narration = None;
    let plan = plan(scene);
    let graph = filter_complex(&compose(&options, &plan)).to_string();

    assert!(graph.contains("anullsrc=r=48000:cl=stereo,atrim=duration=3.000000"));
    assert!(!graph.contains(":a]"));
}

#[test]
fn hook_music_is_ducked_under_narration() {
    let options = options();
    let mut plan = plan(scene(SceneKind::Hook, VisualKind::Image, 1.2));
    plan.music = Some(HookMusic {
        path: PathBuf::from("/job/assets/bgm.mp3"),
        gain_db: -18.0,
        fade_sec: 1.0,
        duck_db: 12.0,
    });
    let args = compose(&options, &plan);
    let graph = filter_complex(&args);

    assert_eq!(arg_after(&args, "-stream_loop"), "-1");
    assert!(graph.contains("volume=-18dB"));
    // Fade is clamped to half of the 1.2 s scene.
    assert!(graph.contains("afade=t=in:st=0:d=0.600000"));
    assert!(graph.contains("[narr]asplit=2[narr_mix][narr_key]"));
    assert!(graph.contains("[music][narr_key]sidechaincompress="));
    assert!(graph.contains("ratio=3.981"));
    assert!(graph.contains("[narr_mix][ducked]amix=inputs=2:normalize=0:duration=first"));
    assert!(graph.ends_with("alimiter=limit=0.95[outa]"));
}

#[test]
fn body_scenes_never_get_music() {
    let options = options();
    let mut plan = plan(scene(SceneKind::Body, VisualKind::Image, 3.0));
    plan.music = Some(HookMusic {
        path: PathBuf::from("/job/assets/bgm.mp3"),
        gain_db: -18.0,
        fade_sec: 1.0,
        duck_db: 12.0,
    });
    let args = compose(&options, &plan);
    assert!(!args.iter().any(|arg| arg.ends_with("bgm.mp3")));
    assert!(!filter_complex(&args).contains("sidechaincompress"));
}

#[test]
fn ducking_ratio_is_clamped() {
    assert_eq!(duck_ratio(0.0), 2.0);
    assert_eq!(duck_ratio(-30.0), 2.0);
    assert_eq!(duck_ratio(60.0), 20.0);
    assert_eq!(duck_ratio(f64::MAX), 20.0);
    assert!((duck_ratio(12.0) - 3.981).abs() < 1e-3);
}

#[test]
fn logo_is_overlaid_before_captions() {
    let options = options();
    let mut scene = scene(SceneKind::Body, VisualKind::Image, 8.0);
    scene.captions = schedule_captions(
        &["aaaaaaaaaa", "bbbbbbbbbb", "cccccccccc", "dddddddddd"],
        8.0,
    );
    let mut plan = plan(scene);
    plan.logo = Some(LogoOverlay {
        path: PathBuf::from("/job/assets/logo.png"),
        width_px: 160,
        margin_px: 40,
    });
    let args = compose(&options, &plan);
    let graph = filter_complex(&args);

    assert!(graph.contains("[1:v]scale=160:-1,format=rgba[logo]"));
    assert!(graph.contains("[0:v][logo]overlay=x=40:y=40"));

    let captions_start = graph.find("[branded]drawtext=").unwrap();
    let caption_chain = &graph[captions_start..];
    assert_eq!(caption_chain.matches("drawtext=").count(), 4);
    assert!(caption_chain.contains("enable=gte(t\\,0.000000)*lt(t\\,2.000000)"));
    assert!(caption_chain.contains("enable=gte(t\\,6.000000)*lt(t\\,8.000000)"));
    assert!(caption_chain.contains("fontfile=/fonts/NotoSansCJK-Bold.ttc"));
    assert!(caption_chain.contains("expansion=none"));
    assert!(caption_chain.contains("x=(w-text_w)/2"));
}

#[test]
fn caption_text_is_escaped_for_filtergraph() {
    let options = options();
    let mut scene = scene(SceneKind::Body, VisualKind::Image, 2.0);
    scene.captions = schedule_captions(&["It's 5:00, ok"], 2.0);
    let plan = plan(scene);
    let graph = filter_complex(&compose(&options, &plan)).to_string();

    assert!(graph.contains("text=It\\\\\\'s 5\\\\:00\\, ok"));
}

#[test]
fn captions_are_skipped_without_font_or_when_disabled() {
    let mut scene = scene(SceneKind::Body, VisualKind::Image, 2.0);
    scene.captions = schedule_captions(&["hello"], 2.0);
    let plan = plan(scene);

    let mut no_font = options();
    no_font.font = None;
    assert!(!filter_complex(&compose(&no_font, &plan)).contains("drawtext"));

    let mut disabled = options();
    disabled.subtitles = false;
    assert!(!filter_complex(&compose(&disabled, &plan)).contains("drawtext"));
}

#[test]
fn concat_copies_streams_in_list_order() {
    let clips = vec![
        PathBuf::from("/job/scene_01.mp4"),
        PathBuf::from("/job/it's/scene_02.mp4"),
    ];
    assert_eq!(
        concat_list(&clips),
        "file '/job/scene_01.mp4'\nfile '/job/it'\\''s/scene_02.mp4'\n"
    );

    let args = compile_concat(Path::new("/job/clips.txt"), Path::new("/job/final.mp4")).args;
    assert_eq!(arg_after(&args, "-f"), "concat");
    assert_eq!(arg_after(&args, "-safe"), "0");
    assert_eq!(arg_after(&args, "-c"), "copy");
    assert_eq!(args.last().unwrap(), "/job/final.mp4");
}
