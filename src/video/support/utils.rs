use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub fn canonicalize_existing(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        anyhow::bail!("{} does not exist", path.display());
    }
    path.canonicalize()
        .with_context(|| format!("Failed to canonicalize path {}", path.display()))
}

/// Human-readable seconds for log lines and tables; filter arguments use `escape::format_time`.
pub fn format_seconds(value: f64) -> String {
    format!("{value:.3}s")
}
