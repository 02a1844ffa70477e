use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A throwaway project directory with its own render config.
pub struct TestEnvironment {
    temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let env = Self {
            temp_dir: tempfile::tempdir()?,
        };
        // Keep the developer's own render.toml out of the picture.
        fs::write(env.config_path(), "jobs = 2\ntimeout_secs = 60\n")?;
        Ok(env)
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.path().join("render.toml")
    }

    /// Write placeholder media files; the pipeline never decodes them in these tests.
    pub fn add_assets(&self, names: &[&str]) -> Result<()> {
        for name in names {
            let path = self.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, b"placeholder")?;
        }
        Ok(())
    }

    pub fn write_request(&self, name: &str, json: &str) -> Result<PathBuf> {
        let path = self.path().join(name);
        fs::write(&path, json)?;
        Ok(path)
    }
}
