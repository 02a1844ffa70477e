use anyhow::{Context, Result};
use serde_json::Value;
use std::process::Command;

use super::common::TestEnvironment;

pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    /// The structured error event `--json` mode writes to stderr.
    pub fn error_event(&self) -> Result<Value> {
        let line = self
            .stderr
            .lines()
            .rev()
            .find(|line| line.starts_with('{'))
            .context("no JSON event on stderr")?;
        Ok(serde_json::from_str(line)?)
    }
}

pub fn run_shortform_command(env: &TestEnvironment, args: &[&str]) -> Result<CommandOutput> {
    let output = Command::new(env!("CARGO_BIN_EXE_shortform"))
        .arg("--config")
        .arg(env.config_path())
        .args(args)
        .current_dir(env.path())
        .env("NO_COLOR", "1")
        .output()?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(-1),
    })
}
