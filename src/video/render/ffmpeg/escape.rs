//! Escaping for ffmpeg filtergraph text.
//!
//! A filtergraph is parsed twice: once to split the graph into filters (`,` `;` `[` `]` are
//! special) and once per filter to split its options (`:` is special). Both levels honour
//! backslash escapes and single quotes, so a literal value has to be escaped for the option
//! level first and the resulting filter text escaped again for the graph level.

use std::path::Path;

/// Characters the option parser treats specially.
const OPTION_SPECIAL: &[char] = &['\\', '\'', ':'];

/// Characters the graph parser treats specially.
const GRAPH_SPECIAL: &[char] = &['\\', '\'', '[', ']', ',', ';'];

fn escape_with(value: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Escape a single option value (`key=value`) so it survives the option parser.
pub fn escape_option_value(value: &str) -> String {
    escape_with(value, OPTION_SPECIAL)
}

/// Escape a complete filter description so it survives the graph parser.
pub fn escape_graph_segment(value: &str) -> String {
    escape_with(value, GRAPH_SPECIAL)
}

/// Fixed-precision seconds for filter arguments.
pub fn format_time(value: f64) -> String {
    format!("{value:.6}")
}

/// Quote a path for a concat demuxer list entry (`file '<path>'`).
pub fn escape_concat_path(path: &Path) -> String {
    path.to_string_lossy().replace('\'', "'\\''")
}
