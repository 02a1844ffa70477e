use super::SceneCompiler;
use super::inputs::InputList;
use crate::video::render::ffmpeg::escape::format_time;
use crate::video::render::ffmpeg::graph::{Chain, Filter, FilterGraph, Pad};
use crate::video::render::plan::ScenePlan;
use crate::video::scene::{SceneKind, VisualKind};
use crate::video::settings::{VideoDimensions, ZoomSettings};

/// Stills are zoomed on a larger canvas and downsampled, which hides zoompan's pixel snapping.
const ZOOM_OVERSAMPLE: f64 = 1.5;
const ZOOM_STEP_PRECISION: f64 = 1e9;

/// Per-frame zoom increment that is safe for a scene of `duration` seconds.
///
/// The requested step is kept unless it would overshoot `zoom.max` before the last frame; the
/// result always satisfies `1 + step * ceil(duration * fps) <= zoom.max`.
pub fn effective_zoom_step(zoom: &ZoomSettings, duration: f64, fps: u32) -> f64 {
    if !zoom.enabled {
        return 0.0;
    }
    let frames = (duration * f64::from(fps)).ceil().max(1.0);
    let budget = (zoom.max - 1.0).max(0.0) / frames;
    // Rounded down so the printed expression never exceeds the budget.
    (zoom.step.min(budget) * ZOOM_STEP_PRECISION).floor() / ZOOM_STEP_PRECISION
}

impl SceneCompiler<'_> {
    pub(super) fn build_visual(
        &self,
        graph: &mut FilterGraph,
        inputs: &mut InputList,
        scene: &ScenePlan,
    ) {
        let duration = format_time(scene.duration);
        let (input, mut filters) = match scene.visual_kind {
            VisualKind::Image => {
                let index = inputs.add_still(&scene.visual, self.options.fps, &duration);
                (index, self.image_filters(scene.duration))
            }
            VisualKind::Video => match scene.kind {
                SceneKind::Hook => {
                    let index = inputs.add_looped(&scene.visual);
                    (index, self.clip_filters())
                }
                SceneKind::Body => {
                    let index = inputs.add_plain(&scene.visual);
                    let mut filters = self.clip_filters();
                    filters.push(
                        Filter::new("tpad")
                            .opt("stop_mode", "clone")
                            .opt("stop_duration", &duration),
                    );
                    (index, filters)
                }
            },
        };

        filters.extend(finish_filters(&duration));
        graph.push(
            Chain::from_pad(Pad::video(input))
                .filters(filters)
                .output("outv"),
        );
    }

    fn image_filters(&self, duration: f64) -> Vec<Filter> {
        let target = self.options.dimensions;
        let fps = self.options.fps;
        let step = effective_zoom_step(&self.options.zoom, duration, fps);
        if step <= 0.0 {
            let mut filters = cover_filters(target);
            filters.push(Filter::new("fps").arg(fps));
            return filters;
        }

        let canvas = target.scaled(ZOOM_OVERSAMPLE);
        let mut filters = cover_filters(canvas);
        filters.push(
            Filter::new("zoompan")
                .opt(
                    "z",
                    format!("min(1+{step:.9}*on,{max})", max = self.options.zoom.max),
                )
                .opt("x", "iw/2-(iw/zoom/2)")
                .opt("y", "ih/2-(ih/zoom/2)")
                .opt("d", 1)
                .opt("s", format!("{}x{}", canvas.width, canvas.height))
                .opt("fps", fps),
        );
        filters.push(
            Filter::new("scale")
                .arg(target.width)
                .arg(target.height)
                .opt("flags", "lanczos"),
        );
        filters
    }

    fn clip_filters(&self) -> Vec<Filter> {
        let mut filters = cover_filters(self.options.dimensions);
        filters.push(Filter::new("fps").arg(self.options.fps));
        filters
    }
}

/// Scale to fill `size` and crop the overflow, keeping the center.
fn cover_filters(size: VideoDimensions) -> Vec<Filter> {
    vec![
        Filter::new("scale")
            .arg(size.width)
            .arg(size.height)
            .opt("force_original_aspect_ratio", "increase"),
        Filter::new("crop").arg(size.width).arg(size.height),
        Filter::new("setsar").arg(1),
    ]
}

fn finish_filters(duration: &str) -> Vec<Filter> {
    vec![
        Filter::new("trim").opt("duration", duration),
        Filter::new("setpts").arg("PTS-STARTPTS"),
        Filter::new("setsar").arg(1),
        Filter::new("format").arg("yuv420p"),
    ]
}
