//! Asset references and their resolution into files inside the job working directory.
//!
//! Every asset class (scene visual, narration, logo, background music) is addressed the same
//! way: a remote `http(s)://` URL, an embedded `data:<media type>;base64,<payload>` URI, or a
//! path on local storage.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use base64::{Engine as _, engine::general_purpose};
use dirs::home_dir;
use sha2::{Digest, Sha256};

use super::support::utils::canonicalize_existing;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetRef {
    Remote(String),
    Embedded { media_type: String, payload: String },
    Local(PathBuf),
}

impl AssetRef {
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            bail!("Asset reference must not be empty");
        }

        if is_url(trimmed) {
            return Ok(AssetRef::Remote(trimmed.to_string()));
        }

        if let Some(rest) = strip_prefix_ignore_case(trimmed, "data:") {
            let (header, payload) = rest
                .split_once(',')
                .ok_or_else(|| anyhow!("Embedded asset is missing the `,` payload separator"))?;
            let mut parts = header.split(';');
            let media_type = parts.next().unwrap_or_default().trim().to_ascii_lowercase();
            if !parts.any(|part| part.trim().eq_ignore_ascii_case("base64")) {
                bail!("Embedded asset must be base64 encoded (got `data:{header}`)");
            }
            return Ok(AssetRef::Embedded {
                media_type,
                payload: payload.to_string(),
            });
        }

        Ok(AssetRef::Local(PathBuf::from(trimmed)))
    }

    /// Short human-readable description for logs and errors.
    pub fn describe(&self) -> String {
        match self {
            AssetRef::Remote(url) => url.clone(),
            AssetRef::Embedded {
                media_type,
                payload,
            } => format!("embedded {} ({} base64 chars)", display_type(media_type), payload.len()),
            AssetRef::Local(path) => path.display().to_string(),
        }
    }
}

fn display_type(media_type: &str) -> &str {
    if media_type.is_empty() {
        "payload"
    } else {
        media_type
    }
}

/// Materializes asset references as local files.
pub struct AssetResolver {
    asset_dir: PathBuf,
    base_dir: PathBuf,
    client: reqwest::blocking::Client,
    downloads: HashMap<String, PathBuf>,
}

impl AssetResolver {
    /// `asset_dir` receives downloaded and decoded files; relative local paths resolve
    /// against `base_dir`.
    pub fn new(asset_dir: &Path, base_dir: &Path, download_timeout: Duration) -> Result<Self> {
        fs::create_dir_all(asset_dir).with_context(|| {
            format!("Failed to create asset directory {}", asset_dir.display())
        })?;
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("shortform/", env!("CARGO_PKG_VERSION")))
            .timeout(download_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            asset_dir: asset_dir.to_path_buf(),
            base_dir: base_dir.to_path_buf(),
            client,
            downloads: HashMap::new(),
        })
    }

    /// Resolve `asset` to a readable file. `name` is a stable file stem for decoded payloads.
    pub fn resolve(&mut self, asset: &AssetRef, name: &str) -> Result<PathBuf> {
        match asset {
            AssetRef::Remote(url) => self.download(url),
            AssetRef::Embedded {
                media_type,
                payload,
            } => self.decode(media_type, payload, name),
            AssetRef::Local(path) => self.resolve_local(path),
        }
    }

    fn download(&mut self, url: &str) -> Result<PathBuf> {
        if let Some(existing) = self.downloads.get(url) {
            return Ok(existing.clone());
        }

        let mut response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("Failed to request {url}"))?
            .error_for_status()
            .with_context(|| format!("Server rejected download of {url}"))?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());
        let extension = extension_from_url(url)
            .or_else(|| content_type.as_deref().and_then(extension_for_media_type))
            .unwrap_or("bin");

        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        let hash = format!("{:x}", hasher.finalize());
        let destination = self.asset_dir.join(format!("{hash}.{extension}"));

        let mut file = fs::File::create(&destination)
            .with_context(|| format!("Failed to create {}", destination.display()))?;
        let written = response
            .copy_to(&mut file)
            .with_context(|| format!("Failed to download {url}"))?;
        if written == 0 {
            bail!("Download of {url} returned an empty body");
        }

        self.downloads.insert(url.to_string(), destination.clone());
        Ok(destination)
    }

    fn decode(&self, media_type: &str, payload: &str, name: &str) -> Result<PathBuf> {
        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = general_purpose::STANDARD
            .decode(compact.as_bytes())
            .with_context(|| format!("Invalid base64 payload for {}", display_type(media_type)))?;
        if bytes.is_empty() {
            bail!("Embedded {} payload is empty", display_type(media_type));
        }

        let extension = extension_for_media_type(media_type).unwrap_or("bin");
        let destination = self.asset_dir.join(format!("{name}.{extension}"));
        fs::write(&destination, bytes)
            .with_context(|| format!("Failed to write {}", destination.display()))?;
        Ok(destination)
    }

    fn resolve_local(&self, path: &Path) -> Result<PathBuf> {
        let candidate = if let Ok(rest) = path.strip_prefix("~") {
            home_dir()
                .context("Unable to determine home directory")?
                .join(rest)
        } else if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        };
        canonicalize_existing(&candidate)
    }
}

fn is_url(value: &str) -> bool {
    let lower = value.trim().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &value[prefix.len()..])
}

fn extension_from_url(url: &str) -> Option<&str> {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let (_, path) = without_scheme.split(['?', '#']).next()?.split_once('/')?;
    let last = path.rsplit('/').next()?;
    let (_, extension) = last.rsplit_once('.')?;
    let valid = !extension.is_empty()
        && extension.len() <= 5
        && extension.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then_some(extension)
}

pub fn extension_for_media_type(media_type: &str) -> Option<&'static str> {
    let essence = media_type.split(';').next()?.trim().to_ascii_lowercase();
    let extension = match essence.as_str() {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        "video/mp4" => "mp4",
        "video/quicktime" => "mov",
        "video/webm" => "webm",
        "video/x-matroska" => "mkv",
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/ogg" => "ogg",
        "audio/aac" => "aac",
        "audio/mp4" | "audio/x-m4a" => "m4a",
        "audio/flac" => "flac",
        _ => return None,
    };
    Some(extension)
}
