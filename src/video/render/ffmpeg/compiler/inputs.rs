use std::path::{Path, PathBuf};

/// `-i` inputs in index order, each with the options that must precede it.
#[derive(Debug, Default)]
pub(super) struct InputList {
    entries: Vec<(Vec<String>, PathBuf)>,
}

impl InputList {
    pub(super) fn new() -> Self {
        Self::default()
    }

    pub(super) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(super) fn add(&mut self, options: Vec<String>, path: &Path) -> usize {
        self.entries.push((options, path.to_path_buf()));
        self.entries.len() - 1
    }

    pub(super) fn add_plain(&mut self, path: &Path) -> usize {
        self.add(Vec::new(), path)
    }

    /// Repeat the input forever; the graph trims it.
    pub(super) fn add_looped(&mut self, path: &Path) -> usize {
        self.add(vec!["-stream_loop".to_string(), "-1".to_string()], path)
    }

    /// Read a still image as a video stream of `duration` seconds at `fps`.
    pub(super) fn add_still(&mut self, path: &Path, fps: u32, duration: &str) -> usize {
        self.add(
            vec![
                "-loop".to_string(),
                "1".to_string(),
                "-framerate".to_string(),
                fps.to_string(),
                "-t".to_string(),
                duration.to_string(),
            ],
            path,
        )
    }

    pub(super) fn push_args(&self, args: &mut Vec<String>) {
        for (options, path) in &self.entries {
            args.extend(options.iter().cloned());
            args.push("-i".to_string());
            args.push(path.to_string_lossy().into_owned());
        }
    }
}
