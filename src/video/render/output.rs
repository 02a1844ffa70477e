use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

pub(super) fn prepare_output_destination(
    output_path: &Path,
    force: bool,
    request_path: &Path,
) -> Result<()> {
    if output_path == request_path {
        bail!(
            "Output path {} would overwrite the render request",
            output_path.display()
        );
    }

    if output_path.exists() && !force {
        bail!(
            "Output file {} already exists. Use --force to overwrite.",
            output_path.display()
        );
    }

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }

    Ok(())
}

/// Move a finished file into place so the destination is either absent or complete.
///
/// A plain rename is tried first; across filesystems the file is copied next to the
/// destination under a `.partial` name and renamed from there.
pub(super) fn finalize_output(staged: &Path, destination: &Path) -> Result<()> {
    if fs::rename(staged, destination).is_ok() {
        return Ok(());
    }

    let partial = partial_path(destination);
    let copied = fs::copy(staged, &partial)
        .with_context(|| format!("Failed to copy render output to {}", partial.display()))
        .and_then(|_| {
            fs::rename(&partial, destination).with_context(|| {
                format!("Failed to move render output to {}", destination.display())
            })
        });
    if copied.is_err() {
        let _ = fs::remove_file(&partial);
    }
    copied
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| OsString::from("output"));
    name.push(".partial");
    destination.with_file_name(name)
}
