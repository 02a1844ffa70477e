use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use thiserror::Error;

use crate::video::support::ffmpeg::{duration_probe_args, parse_probe_duration};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const MAX_DIAGNOSTIC_LINES: usize = 12;

/// Shared flag checked by every running child process of a job.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// When a child process must be stopped early.
#[derive(Debug, Clone, Default)]
pub struct RunLimits {
    pub cancel: CancelToken,
    pub deadline: Option<Instant>,
}

impl RunLimits {
    pub fn new(cancel: CancelToken, deadline: Option<Instant>) -> Self {
        Self { cancel, deadline }
    }

    fn past_deadline(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// The error a child stopped by these limits stands for, if any.
    fn interruption(&self, program: &str) -> Option<RunError> {
        let program = program.to_string();
        if self.cancel.is_cancelled() {
            Some(RunError::Cancelled { program })
        } else if self.past_deadline() {
            Some(RunError::TimedOut { program })
        } else {
            None
        }
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{program} exited with status {}: {diagnostics}", display_code(.code))]
    Failed {
        program: String,
        code: Option<i32>,
        diagnostics: String,
    },
    #[error("{program} was cancelled")]
    Cancelled { program: String },
    #[error("{program} did not finish before the job deadline")]
    TimedOut { program: String },
}

fn display_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |code| code.to_string())
}

pub trait FfmpegRunner: Sync {
    fn run(&self, args: &[String], limits: &RunLimits) -> Result<(), RunError>;
}

pub trait MediaProbe: Sync {
    /// Container duration in seconds.
    fn duration(&self, path: &Path, limits: &RunLimits) -> Result<f64>;
}

/// Display name of an external tool for error messages.
fn program_name(program: &Path) -> String {
    program
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.display().to_string())
}

/// Start `program` and poll it until it exits, killing it once `limits` say to stop.
///
/// A child that dies after the job was cancelled (Ctrl-C reaches the whole process group)
/// counts as cancelled rather than failed.
fn run_polled(
    program: &Path,
    args: Vec<OsString>,
    capture_stdout: bool,
    limits: &RunLimits,
) -> Result<Output, RunError> {
    let name = program_name(program);
    if let Some(interrupted) = limits.interruption(&name) {
        return Err(interrupted);
    }

    let expression = duct::cmd(program, args)
        .stdin_null()
        .stderr_capture()
        .unchecked();
    let expression = if capture_stdout {
        expression.stdout_capture()
    } else {
        expression.stdout_null()
    };
    let handle = expression.start().map_err(|source| RunError::Spawn {
        program: name.clone(),
        source,
    })?;

    loop {
        match handle.try_wait() {
            Ok(Some(output)) => return settle(output, &name, limits),
            Ok(None) => {}
            Err(source) => {
                return Err(RunError::Spawn {
                    program: name,
                    source,
                });
            }
        }

        if let Some(interrupted) = limits.interruption(&name) {
            let _ = handle.kill();
            return Err(interrupted);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[derive(Debug, Clone)]
pub struct SystemFfmpegRunner {
    program: PathBuf,
}

impl SystemFfmpegRunner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl FfmpegRunner for SystemFfmpegRunner {
    fn run(&self, args: &[String], limits: &RunLimits) -> Result<(), RunError> {
        let args = args.iter().map(OsString::from).collect();
        let output = run_polled(&self.program, args, false, limits)?;
        if output.status.success() {
            return Ok(());
        }
        Err(RunError::Failed {
            program: program_name(&self.program),
            code: output.status.code(),
            diagnostics: summarize_diagnostics(&String::from_utf8_lossy(&output.stderr)),
        })
    }
}

/// Classify a child that exited on its own.
fn settle(output: &Output, program: &str, limits: &RunLimits) -> Result<Output, RunError> {
    if !output.status.success()
        && let Some(interrupted) = limits.interruption(program)
    {
        return Err(interrupted);
    }
    Ok(output.clone())
}

/// Keep the lines that explain a failure; fall back to the tail of the log.
fn summarize_diagnostics(stderr: &str) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let errors: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|line| line.to_ascii_lowercase().contains("error"))
        .collect();

    let selected = if errors.is_empty() { &lines } else { &errors };
    let start = selected.len().saturating_sub(MAX_DIAGNOSTIC_LINES);
    let summary = selected[start..].join("\n");
    if summary.is_empty() {
        "no diagnostics captured".to_string()
    } else {
        summary
    }
}

/// Prints each command instead of running it.
#[derive(Debug, Default)]
pub struct DryRunRunner {
    program: String,
    printed: Mutex<usize>,
}

impl DryRunRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            printed: Mutex::new(0),
        }
    }

    pub fn commands_printed(&self) -> usize {
        self.printed.lock().map(|count| *count).unwrap_or_default()
    }
}

impl FfmpegRunner for DryRunRunner {
    fn run(&self, args: &[String], _limits: &RunLimits) -> Result<(), RunError> {
        let line = std::iter::once(self.program.as_str())
            .chain(args.iter().map(String::as_str))
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ");
        // Holding the lock keeps concurrent scene commands on separate lines.
        let mut printed = self
            .printed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        println!("{line}");
        *printed += 1;
        Ok(())
    }
}

pub fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=+,@%".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "'\\''"))
    }
}

#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    program: PathBuf,
}

impl FfprobeProbe {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl MediaProbe for FfprobeProbe {
    fn duration(&self, path: &Path, limits: &RunLimits) -> Result<f64> {
        let output = run_polled(&self.program, duration_probe_args(path), true, limits)?;
        parse_probe_duration(&output, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_prefer_error_lines() {
        let stderr = "Input #0, mov\n  Stream #0:0: Video\n[AVFilterGraph] Error parsing filterchain\nConversion failed!\n";
        assert_eq!(
            summarize_diagnostics(stderr),
            "[AVFilterGraph] Error parsing filterchain"
        );
    }

    #[test]
    fn diagnostics_fall_back_to_tail() {
        let stderr = (0..20).map(|i| format!("line {i}\n")).collect::<String>();
        let summary = summarize_diagnostics(&stderr);
        assert_eq!(summary.lines().count(), MAX_DIAGNOSTIC_LINES);
        assert!(summary.ends_with("line 19"));
        assert_eq!(summarize_diagnostics("  \n"), "no diagnostics captured");
    }

    #[test]
    fn quotes_only_when_needed() {
        assert_eq!(shell_quote("-filter_complex"), "-filter_complex");
        assert_eq!(shell_quote("[0:v]scale=1080:1920[v]"), "'[0:v]scale=1080:1920[v]'");
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn cancelled_token_stops_before_spawn() {
        let runner = SystemFfmpegRunner::new("/nonexistent/ffmpeg");
        let token = CancelToken::new();
        token.cancel();
        let err = runner
            .run(&["-version".to_string()], &RunLimits::new(token, None))
            .unwrap_err();
        assert!(matches!(err, RunError::Cancelled { .. }));
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let runner = SystemFfmpegRunner::new("/nonexistent/ffmpeg");
        let err = runner
            .run(&["-version".to_string()], &RunLimits::default())
            .unwrap_err();
        assert!(matches!(err, RunError::Spawn { .. }));
    }

    #[cfg(unix)]
    fn exited_with(code: i32) -> Output {
        use std::os::unix::process::ExitStatusExt;
        Output {
            status: std::process::ExitStatus::from_raw(code << 8),
            stdout: Vec::new(),
            stderr: Vec::new(),
        }
    }

    #[cfg(unix)]
    fn shell(command: &str) -> Vec<String> {
        vec!["-c".to_string(), command.to_string()]
    }

    #[cfg(unix)]
    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn child_killed_by_interrupt_counts_as_cancelled() {
        let token = CancelToken::new();
        token.cancel();
        let limits = RunLimits::new(token, None);

        let err = settle(&exited_with(255), "ffmpeg", &limits).unwrap_err();

        assert!(matches!(err, RunError::Cancelled { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn child_failing_past_deadline_counts_as_timed_out() {
        let limits = RunLimits::new(CancelToken::new(), Some(Instant::now()));
        let err = settle(&exited_with(1), "ffmpeg", &limits).unwrap_err();
        assert!(matches!(err, RunError::TimedOut { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn successful_child_is_kept_after_cancel() {
        let token = CancelToken::new();
        token.cancel();
        let output = settle(&exited_with(0), "ffmpeg", &RunLimits::new(token, None)).unwrap();
        assert!(output.status.success());
    }

    #[cfg(unix)]
    #[test]
    fn failing_child_reports_diagnostics() {
        let err = SystemFfmpegRunner::new("/bin/sh")
            .run(&shell("echo 'Error opening input file' >&2; exit 1"), &RunLimits::default())
            .unwrap_err();

        match err {
            RunError::Failed {
                code, diagnostics, ..
            } => {
                assert_eq!(code, Some(1));
                assert_eq!(diagnostics, "Error opening input file");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn cancelling_mid_run_stops_the_child() {
        let token = CancelToken::new();
        let canceller = token.clone();
        let started = Instant::now();

        let trigger = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            canceller.cancel();
        });
        let err = SystemFfmpegRunner::new("/bin/sh")
            .run(&shell("exec sleep 10"), &RunLimits::new(token, None))
            .unwrap_err();
        trigger.join().unwrap();

        assert!(matches!(err, RunError::Cancelled { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[test]
    fn probe_reads_duration() {
        let dir = tempfile::tempdir().unwrap();
        let ffprobe = script(dir.path(), "ffprobe", "echo 2.500000");

        let seconds = FfprobeProbe::new(ffprobe)
            .duration(Path::new("narration.mp3"), &RunLimits::default())
            .unwrap();

        assert_eq!(seconds, 2.5);
    }

    #[cfg(unix)]
    #[test]
    fn hung_probe_honors_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let ffprobe = script(dir.path(), "ffprobe", "exec sleep 10");
        let limits = RunLimits::new(
            CancelToken::new(),
            Some(Instant::now() + Duration::from_millis(100)),
        );
        let started = Instant::now();

        let err = FfprobeProbe::new(ffprobe)
            .duration(Path::new("narration.mp3"), &limits)
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<RunError>(),
            Some(RunError::TimedOut { .. })
        ));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn dry_run_counts_commands() {
        let runner = DryRunRunner::new("ffmpeg");
        runner
            .run(&["-i".to_string(), "in.mp4".to_string()], &RunLimits::default())
            .unwrap();
        assert_eq!(runner.commands_printed(), 1);
    }
}
