pub mod ffmpeg;
pub mod utils;
