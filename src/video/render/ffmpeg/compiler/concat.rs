use std::path::{Path, PathBuf};

use super::{FfmpegCompileOutput, global_args, push_all};
use crate::video::render::ffmpeg::escape::escape_concat_path;

/// Concat demuxer list: one `file '<path>'` line per clip, in playback order.
pub fn concat_list(clips: &[PathBuf]) -> String {
    clips
        .iter()
        .map(|clip| format!("file '{}'\n", escape_concat_path(clip)))
        .collect()
}

/// Join the clips listed in `list` without re-encoding.
pub fn compile_concat(list: &Path, output: &Path) -> FfmpegCompileOutput {
    let mut args = global_args();
    push_all(&mut args, ["-f", "concat", "-safe", "0", "-i"]);
    args.push(list.to_string_lossy().into_owned());
    push_all(&mut args, ["-c", "copy", "-movflags", "+faststart"]);
    args.push(output.to_string_lossy().into_owned());
    FfmpegCompileOutput { args }
}
