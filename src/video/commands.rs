use std::path::Path;

use anyhow::Result;

use super::cli::VideoCommands;
use super::render::{handle_break_tag, handle_plan, handle_render};

pub fn handle_video_command(command: VideoCommands, config_path: Option<&Path>) -> Result<()> {
    match command {
        VideoCommands::Render(args) => handle_render(args, config_path).map(|_| ()),
        VideoCommands::Plan(args) => handle_plan(args, config_path),
        VideoCommands::BreakTag => handle_break_tag(),
    }
}
