use super::inputs::InputList;
use super::{AUDIO_SAMPLE_RATE, SceneCompiler};
use crate::video::render::ffmpeg::escape::format_time;
use crate::video::render::ffmpeg::graph::{Chain, Filter, FilterGraph, Pad};
use crate::video::render::plan::{HookMusic, ScenePlan};

/// Narration fades out over this long, ending exactly at the scene boundary.
pub(super) const NARRATION_FADE_SEC: f64 = 0.25;
const DUCK_RATIO_MIN: f64 = 2.0;
const DUCK_RATIO_MAX: f64 = 20.0;
const DUCK_THRESHOLD: f64 = 0.05;
const LIMITER_CEILING: f64 = 0.95;

/// Compression ratio applied to music while narration is present.
pub(super) fn duck_ratio(duck_db: f64) -> f64 {
    let ratio = 10f64.powf(duck_db / 20.0);
    if ratio.is_finite() {
        ratio.clamp(DUCK_RATIO_MIN, DUCK_RATIO_MAX)
    } else if duck_db > 0.0 {
        DUCK_RATIO_MAX
    } else {
        DUCK_RATIO_MIN
    }
}

/// Fade length that fits twice into `duration`.
pub(super) fn clamp_fade(fade: f64, duration: f64) -> f64 {
    fade.max(0.0).min(duration / 2.0)
}

impl SceneCompiler<'_> {
    /// Audio side of the compose graph, ending at `[outa]`.
    pub(super) fn build_audio(
        &self,
        graph: &mut FilterGraph,
        inputs: &mut InputList,
        scene: &ScenePlan,
    ) {
        let music = self.plan.music_for(scene);
        let narration_label = if music.is_some() { "narr" } else { "outa" };
        let duration = format_time(scene.duration);

        let narration = match &scene.narration {
            Some(path) => {
                let index = inputs.add_plain(path);
                let fade = clamp_fade(NARRATION_FADE_SEC, scene.duration);
                let mut chain = Chain::from_pad(Pad::audio(index))
                    .filter(
                        Filter::new("aresample")
                            .arg(AUDIO_SAMPLE_RATE)
                            .opt("async", 1),
                    )
                    .filter(stereo_format())
                    .filter(Filter::new("apad"))
                    .filter(Filter::new("atrim").opt("duration", &duration));
                if fade > 0.0 {
                    chain = chain.filter(fade_out(scene.duration, fade));
                }
                chain.filter(Filter::new("asetpts").arg("PTS-STARTPTS"))
            }
            None => Chain::new()
                .filter(
                    Filter::new("anullsrc")
                        .opt("r", AUDIO_SAMPLE_RATE)
                        .opt("cl", "stereo"),
                )
                .filter(Filter::new("atrim").opt("duration", &duration))
                .filter(Filter::new("asetpts").arg("PTS-STARTPTS")),
        };
        graph.push(narration.output(narration_label));

        if let Some(music) = music {
            self.build_ducked_music(graph, inputs, scene, music);
        }
    }

    fn build_ducked_music(
        &self,
        graph: &mut FilterGraph,
        inputs: &mut InputList,
        scene: &ScenePlan,
        music: &HookMusic,
    ) {
        let index = inputs.add_looped(&music.path);
        let duration = format_time(scene.duration);
        let fade = clamp_fade(music.fade_sec, scene.duration);

        let mut chain = Chain::from_pad(Pad::audio(index))
            .filter(Filter::new("aresample").arg(AUDIO_SAMPLE_RATE))
            .filter(stereo_format())
            .filter(Filter::new("atrim").opt("duration", &duration))
            .filter(Filter::new("asetpts").arg("PTS-STARTPTS"))
            .filter(Filter::new("volume").arg(format!("{}dB", music.gain_db)));
        if fade > 0.0 {
            chain = chain
                .filter(
                    Filter::new("afade")
                        .opt("t", "in")
                        .opt("st", 0)
                        .opt("d", format_time(fade)),
                )
                .filter(fade_out(scene.duration, fade));
        }
        graph.push(chain.output("music"));

        graph.push(
            Chain::from_pad(Pad::label("narr"))
                .filter(Filter::new("asplit").arg(2))
                .output("narr_mix")
                .output("narr_key"),
        );
        graph.push(
            Chain::from_pad(Pad::label("music"))
                .input(Pad::label("narr_key"))
                .filter(
                    Filter::new("sidechaincompress")
                        .opt("threshold", DUCK_THRESHOLD)
                        .opt("ratio", format!("{:.3}", duck_ratio(music.duck_db)))
                        .opt("attack", 20)
                        .opt("release", 300),
                )
                .output("ducked"),
        );
        graph.push(
            Chain::from_pad(Pad::label("narr_mix"))
                .input(Pad::label("ducked"))
                .filter(
                    Filter::new("amix")
                        .opt("inputs", 2)
                        .opt("normalize", 0)
                        .opt("duration", "first"),
                )
                .filter(Filter::new("alimiter").opt("limit", LIMITER_CEILING))
                .output("outa"),
        );
    }
}

fn stereo_format() -> Filter {
    Filter::new("aformat")
        .opt("sample_fmts", "fltp")
        .opt("channel_layouts", "stereo")
}

fn fade_out(duration: f64, fade: f64) -> Filter {
    Filter::new("afade")
        .opt("t", "out")
        .opt("st", format_time(duration - fade))
        .opt("d", format_time(fade))
}
