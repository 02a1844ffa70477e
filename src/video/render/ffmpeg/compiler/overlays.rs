use std::path::Path;

use super::SceneCompiler;
use super::inputs::InputList;
use crate::video::render::ffmpeg::escape::format_time;
use crate::video::render::ffmpeg::graph::{Chain, Filter, FilterGraph, Pad};
use crate::video::render::plan::ScenePlan;
use crate::video::subtitles::CaptionWindow;

const SUBTITLE_FONT_RATIO: f64 = 0.055;
const SUBTITLE_BOTTOM_RATIO: f64 = 0.16;
const SUBTITLE_BORDER_PX: u32 = 3;
const SUBTITLE_BOX_PADDING_PX: u32 = 18;
const SUBTITLE_BOX_COLOR: &str = "black@0.45";

impl SceneCompiler<'_> {
    /// Video side of the compose graph: logo, then captions, ending at `[outv]`.
    pub(super) fn build_overlays(
        &self,
        graph: &mut FilterGraph,
        inputs: &mut InputList,
        scene: &ScenePlan,
        base_index: usize,
    ) {
        let mut current = Pad::video(base_index);

        if let Some(logo) = &self.plan.logo {
            let logo_index = inputs.add(
                vec![
                    "-loop".to_string(),
                    "1".to_string(),
                    "-t".to_string(),
                    format_time(scene.duration),
                ],
                &logo.path,
            );
            graph.push(
                Chain::from_pad(Pad::video(logo_index))
                    .filter(Filter::new("scale").arg(logo.width_px).arg(-1))
                    .filter(Filter::new("format").arg("rgba"))
                    .output("logo"),
            );
            graph.push(
                Chain::from_pad(current)
                    .input(Pad::label("logo"))
                    .filter(
                        Filter::new("overlay")
                            .opt("x", logo.margin_px)
                            .opt("y", logo.margin_px)
                            .opt("eof_action", "repeat"),
                    )
                    .output("branded"),
            );
            current = Pad::label("branded");
        }

        let captions = self.caption_filters(&scene.captions);
        let filters = if captions.is_empty() {
            vec![Filter::new("null")]
        } else {
            captions
        };
        graph.push(Chain::from_pad(current).filters(filters).output("outv"));
    }

    fn caption_filters(&self, windows: &[CaptionWindow]) -> Vec<Filter> {
        if !self.options.subtitles {
            return Vec::new();
        }
        let Some(font) = self.options.font.as_deref() else {
            return Vec::new();
        };
        windows
            .iter()
            .filter(|window| window.duration() > 0.0)
            .map(|window| self.drawtext(font, window))
            .collect()
    }

    fn drawtext(&self, font: &Path, window: &CaptionWindow) -> Filter {
        let dims = self.options.dimensions;
        let font_size = (f64::from(dims.shorter_side()) * SUBTITLE_FONT_RATIO).round() as u32;
        let bottom = (f64::from(dims.height) * SUBTITLE_BOTTOM_RATIO).round() as u32;

        Filter::new("drawtext")
            .opt("fontfile", font.to_string_lossy())
            .opt("text", &window.text)
            .opt("expansion", "none")
            .opt("fontsize", font_size)
            .opt("fontcolor", "white")
            .opt("borderw", SUBTITLE_BORDER_PX)
            .opt("bordercolor", "black")
            .opt("box", 1)
            .opt("boxcolor", SUBTITLE_BOX_COLOR)
            .opt("boxborderw", SUBTITLE_BOX_PADDING_PX)
            .opt("x", "(w-text_w)/2")
            .opt("y", format!("h-text_h-{bottom}"))
            .opt(
                "enable",
                format!(
                    "gte(t,{})*lt(t,{})",
                    format_time(window.start),
                    format_time(window.end)
                ),
            )
    }
}
