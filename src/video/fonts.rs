use std::path::{Path, PathBuf};

use crate::ui::prelude::Level;
use crate::video::render::logging::log_event;

/// Fonts known to cover Hangul and Latin, checked when fontconfig has no answer.
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Bold.ttc",
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/noto-cjk/NotoSansCJK-Bold.ttc",
    "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/google-noto-cjk/NotoSansCJK-Bold.ttc",
    "/usr/share/fonts/truetype/nanum/NanumGothicBold.ttf",
    "/usr/share/fonts/truetype/nanum/NanumGothic.ttf",
    "/Library/Fonts/AppleSDGothicNeo.ttc",
    "/System/Library/Fonts/AppleSDGothicNeo.ttc",
    "C:\\Windows\\Fonts\\malgunbd.ttf",
    "C:\\Windows\\Fonts\\malgun.ttf",
];

/// Find a caption font. Returns `None` when nothing usable exists; captions are then skipped.
pub fn discover_font(explicit: Option<&Path>, family: &str) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Some(path.to_path_buf());
        }
        log_event(
            Level::Warn,
            "render.font.missing",
            format!(
                "Configured font {} does not exist; falling back to discovery",
                path.display()
            ),
        );
    }

    if let Some(path) = fontconfig_match(family) {
        return Some(path);
    }

    first_existing(FONT_CANDIDATES.iter().map(Path::new))
}

fn fontconfig_match(family: &str) -> Option<PathBuf> {
    let fc_match = which::which("fc-match").ok()?;
    let output = duct::cmd!(fc_match, "-f", "%{file}", family)
        .stdout_capture()
        .stderr_null()
        .unchecked()
        .run()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let path = PathBuf::from(String::from_utf8_lossy(&output.stdout).trim());
    path.is_file().then_some(path)
}

fn first_existing<'a>(candidates: impl IntoIterator<Item = &'a Path>) -> Option<PathBuf> {
    candidates
        .into_iter()
        .find(|candidate| candidate.is_file())
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn explicit_font_wins() {
        let temp = tempdir().unwrap();
        let font = temp.path().join("caption.ttf");
        fs::write(&font, b"font").unwrap();
        assert_eq!(discover_font(Some(&font), "Nonexistent Family"), Some(font));
    }

    #[test]
    fn first_existing_skips_missing_candidates() {
        let temp = tempdir().unwrap();
        let present = temp.path().join("b.ttf");
        fs::write(&present, b"font").unwrap();
        let missing = temp.path().join("a.ttf");

        let found = first_existing([missing.as_path(), present.as_path()]);

        assert_eq!(found, Some(present));
        assert_eq!(first_existing([missing.as_path()]), None);
    }
}
