mod assets;
pub mod cli;
pub mod commands;
mod config;
mod fonts;
pub mod render;
mod request;
mod scene;
mod settings;
mod subtitles;
mod support;
mod timing;

pub use cli::VideoCommands;
pub use commands::handle_video_command;
pub use render::error::RenderError;
