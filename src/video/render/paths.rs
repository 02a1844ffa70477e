use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};

/// Destination for the rendered video.
///
/// A relative `out_file` resolves against `request_dir`; without one the video lands next to
/// the request as `<request-stem>.mp4`.
pub fn resolve_output_path(
    out_file: Option<&PathBuf>,
    request_path: &Path,
    request_dir: &Path,
) -> Result<PathBuf> {
    if let Some(provided) = out_file {
        let resolved = if provided.is_absolute() {
            provided.clone()
        } else {
            request_dir.join(provided)
        };
        return Ok(resolved);
    }

    let stem = request_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| {
            anyhow!(
                "Request path {} has no valid file name",
                request_path.display()
            )
        })?;
    Ok(request_dir.join(format!("{stem}.mp4")))
}
