use clap::{Args, Subcommand, ValueHint};
use std::path::PathBuf;

#[derive(Subcommand, Debug, Clone)]
pub enum VideoCommands {
    /// Render a request file into a single short-form video
    Render(RenderArgs),
    /// Resolve assets and show per-scene timing without rendering
    Plan(PlanArgs),
    /// Print the speech-markup break tag that matches the scene pause
    BreakTag,
}

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    /// JSON render request (`scenes` and `settings`)
    #[arg(value_hint = ValueHint::FilePath)]
    pub request: PathBuf,

    /// Optional output path; defaults to <request-name>.mp4 next to the request
    #[arg(short = 'o', long = "out-file", value_hint = ValueHint::FilePath)]
    pub out_file: Option<PathBuf>,

    /// Overwrite an existing output file
    #[arg(long)]
    pub force: bool,

    /// Show the ffmpeg commands that would be executed without running them
    #[arg(long)]
    pub dry_run: bool,

    /// Scenes rendered concurrently (overrides the render config)
    #[arg(
        short = 'j',
        long,
        value_name = "N",
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..=16)
    )]
    pub jobs: Option<usize>,

    /// Wall-clock limit for the whole job in seconds, 0 for none (overrides the render config)
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Keep intermediate files and print where they are
    #[arg(long)]
    pub keep_workdir: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    /// JSON render request (`scenes` and `settings`)
    #[arg(value_hint = ValueHint::FilePath)]
    pub request: PathBuf,
}
