//! Event output shared by every command.
//!
//! Commands report progress as events with a dotted code (`render.scene.compose`). In text
//! mode an event is one human-readable line; with `--json` it is one JSON object per line so
//! callers can follow a render without scraping text.

use colored::*;
use serde::Serialize;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{LazyLock, RwLock};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warn,
    Error,
    Debug,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Success => "success",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Debug => "debug",
        }
    }

    /// Problems go to stderr so stdout stays usable for tables and printed commands.
    fn to_stderr(self) -> bool {
        matches!(self, Level::Warn | Level::Error | Level::Debug)
    }
}

#[derive(Debug, Clone, Copy)]
struct Renderer {
    format: OutputFormat,
    color: bool,
}

static RENDERER: LazyLock<RwLock<Renderer>> = LazyLock::new(|| {
    RwLock::new(Renderer {
        format: OutputFormat::Text,
        color: true,
    })
});

static STARTED: LazyLock<Instant> = LazyLock::new(Instant::now);

static DEBUG_MODE: AtomicBool = AtomicBool::new(false);

pub fn set_debug_mode(enabled: bool) {
    DEBUG_MODE.store(enabled, Ordering::Relaxed);
}

fn is_debug_enabled() -> bool {
    DEBUG_MODE.load(Ordering::Relaxed)
}

pub fn init(format: OutputFormat, color: bool) {
    LazyLock::force(&STARTED);
    if let Ok(mut renderer) = RENDERER.write() {
        renderer.format = format;
        renderer.color = color;
    }
}

fn current_renderer() -> Renderer {
    RENDERER.read().map(|renderer| *renderer).unwrap_or(Renderer {
        format: OutputFormat::Text,
        color: false,
    })
}

pub fn get_output_format() -> OutputFormat {
    current_renderer().format
}

#[derive(Serialize)]
struct Event<'a> {
    level: &'a str,
    code: &'a str,
    message: &'a str,
    /// Milliseconds since the process started.
    elapsed_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

fn text_line(level: Level, code: &str, message: &str, color: bool) -> String {
    let line = match level {
        Level::Warn => format!("warning: {message}"),
        Level::Debug => format!("[{code}] {message}"),
        _ => message.to_string(),
    };
    if !color {
        return line;
    }
    match level {
        Level::Info => line.normal().to_string(),
        Level::Success => line.green().bold().to_string(),
        Level::Warn => line.yellow().bold().to_string(),
        Level::Error => line.red().bold().to_string(),
        Level::Debug => line.dimmed().to_string(),
    }
}

pub fn emit(level: Level, code: &str, message: &str, data: Option<serde_json::Value>) {
    if level == Level::Debug && !is_debug_enabled() {
        return;
    }

    let renderer = current_renderer();
    let line = match renderer.format {
        OutputFormat::Text => text_line(level, code, message, renderer.color),
        OutputFormat::Json => {
            let event = Event {
                level: level.as_str(),
                code,
                message,
                elapsed_ms: STARTED.elapsed().as_millis(),
                data,
            };
            match serde_json::to_string(&event) {
                Ok(line) => line,
                Err(_) => return,
            }
        }
    };

    if level.to_stderr() {
        let _ = writeln!(io::stderr().lock(), "{line}");
    } else {
        let _ = writeln!(io::stdout().lock(), "{line}");
    }
}

pub mod prelude {
    pub use super::{Level, OutputFormat, emit, get_output_format};
}
