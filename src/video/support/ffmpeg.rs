use anyhow::{Context, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Output;

/// ffprobe arguments that print only the container duration of `path`.
pub fn duration_probe_args(path: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "-v",
        "error",
        "-show_entries",
        "format=duration",
        "-of",
        "default=noprint_wrappers=1:nokey=1",
    ]
    .into_iter()
    .map(OsString::from)
    .collect();
    args.push(path.as_os_str().to_owned());
    args
}

/// Read the container duration of `path` in seconds out of a finished ffprobe run.
pub fn parse_probe_duration(output: &Output, path: &Path) -> Result<f64> {
    if !output.status.success() {
        anyhow::bail!(
            "ffprobe failed for {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let duration_str = String::from_utf8_lossy(&output.stdout);
    let duration: f64 = duration_str
        .trim()
        .parse()
        .with_context(|| format!("Failed to parse ffprobe duration `{}`", duration_str.trim()))?;

    if !duration.is_finite() || duration < 0.0 {
        anyhow::bail!("ffprobe reported invalid duration {duration} for {}", path.display());
    }

    Ok(duration)
}

/// Locate an external tool by name or explicit path.
pub fn locate_tool(program: &str) -> Result<PathBuf> {
    which::which(program).with_context(|| {
        format!("`{program}` was not found. Install ffmpeg or set its path in the render config.")
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;
    use std::process::ExitStatus;

    fn output(code: i32, stdout: &str, stderr: &str) -> Output {
        Output {
            status: ExitStatus::from_raw(code << 8),
            stdout: stdout.as_bytes().to_vec(),
            stderr: stderr.as_bytes().to_vec(),
        }
    }

    #[test]
    fn reads_duration_from_stdout() {
        let duration = parse_probe_duration(&output(0, "4.400000\n", ""), Path::new("n.mp3"));
        assert_eq!(duration.unwrap(), 4.4);
    }

    #[test]
    fn failed_probe_reports_stderr() {
        let err = parse_probe_duration(
            &output(1, "", "n.mp3: Invalid data found when processing input"),
            Path::new("n.mp3"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("Invalid data found"));
    }

    #[test]
    fn unparsable_duration_is_an_error() {
        assert!(parse_probe_duration(&output(0, "N/A\n", ""), Path::new("n.mp3")).is_err());
    }

    #[test]
    fn path_is_the_last_argument() {
        let args = duration_probe_args(Path::new("/tmp/final.mp4"));
        assert_eq!(args.last().unwrap(), "/tmp/final.mp4");
        assert!(args.iter().any(|arg| arg == "format=duration"));
    }
}
