mod ui;
mod video;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueHint};

use crate::ui::prelude::*;
use crate::video::{RenderError, VideoCommands, handle_video_command};

/// Render narrated short-form videos from declarative scene lists
#[derive(Parser, Debug)]
#[command(name = "shortform", author, version, about, long_about = None)]
struct Cli {
    /// Activate debug mode
    #[arg(short, long, global = true)]
    debug: bool,

    /// Emit one JSON event per line instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Render config file (defaults to <config dir>/shortform/render.toml)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: VideoCommands,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    ui::init(format, colored::control::SHOULD_COLORIZE.should_colorize());
    ui::set_debug_mode(cli.debug);
    emit(Level::Debug, "debug.enabled", "Debug mode is on", None);

    match handle_video_command(cli.command, cli.config.as_deref()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report_error(&err),
    }
}

fn report_error(err: &anyhow::Error) -> ExitCode {
    let Some(render) = err.downcast_ref::<RenderError>() else {
        emit(Level::Error, "error", &format!("Error: {err:#}"), None);
        return ExitCode::FAILURE;
    };

    emit(
        Level::Error,
        render.code(),
        &format!("Error: {}", render.full_message()),
        Some(render.payload()),
    );
    ExitCode::from(exit_status(render))
}

fn exit_status(err: &RenderError) -> u8 {
    match err {
        RenderError::Cancelled => 130,
        err if err.is_input_error() => 2,
        _ => 1,
    }
}
