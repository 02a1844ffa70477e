use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tempfile::TempDir;

use super::error::RenderError;
use super::ffmpeg::services::{CancelToken, RunLimits};
use crate::video::config::RenderConfig;

/// Resources owned by one render job.
///
/// Every intermediate file lives under [`JobContext::workdir`], which is removed when the
/// context drops unless the caller asked to keep it.
pub struct JobContext {
    workdir: TempDir,
    keep_workdir: bool,
    cancel: CancelToken,
    deadline: Option<Instant>,
    pub config: RenderConfig,
    /// Caption font; `None` means captions are skipped.
    pub font: Option<PathBuf>,
}

impl JobContext {
    pub fn new(
        config: RenderConfig,
        cancel: CancelToken,
        keep_workdir: bool,
    ) -> Result<Self, RenderError> {
        let workdir = tempfile::Builder::new().prefix("shortform-").tempdir()?;
        let deadline = (config.timeout_secs > 0)
            .then(|| Instant::now() + Duration::from_secs(config.timeout_secs));
        Ok(Self {
            workdir,
            keep_workdir,
            cancel,
            deadline,
            config,
            font: None,
        })
    }

    pub fn workdir(&self) -> &Path {
        self.workdir.path()
    }

    pub fn asset_dir(&self) -> PathBuf {
        self.workdir().join("assets")
    }

    pub fn base_path(&self, scene: usize) -> PathBuf {
        self.workdir().join(format!("scene_{scene:02}_base.mp4"))
    }

    pub fn clip_path(&self, scene: usize) -> PathBuf {
        self.workdir().join(format!("scene_{scene:02}.mp4"))
    }

    pub fn limits(&self) -> RunLimits {
        RunLimits::new(self.cancel.clone(), self.deadline)
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Fail fast when the job was cancelled or ran out of time.
    pub fn check(&self) -> Result<(), RenderError> {
        if self.cancel.is_cancelled() {
            return Err(RenderError::Cancelled);
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(RenderError::TimedOut(self.config.timeout_secs));
        }
        Ok(())
    }

    /// Release the working directory, or hand it back when it is to be kept.
    pub fn finish(self) -> Option<PathBuf> {
        if self.keep_workdir {
            Some(self.workdir.keep())
        } else {
            None
        }
    }
}
