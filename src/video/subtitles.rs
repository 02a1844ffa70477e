//! Caption scheduling.
//!
//! A scene's caption lines are shown one after another. Each line gets a share of the scene
//! proportional to its character count, and the windows tile `[0, duration]` exactly.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptionWindow {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

impl CaptionWindow {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Half-open membership test matching the overlay enable expression.
    #[cfg(test)]
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t < self.end
    }
}

/// Split `duration` seconds between `lines`. Blank lines are ignored; no lines means no windows.
pub fn schedule_captions<S: AsRef<str>>(lines: &[S], duration: f64) -> Vec<CaptionWindow> {
    let lines: Vec<&str> = lines
        .iter()
        .map(|line| line.as_ref().trim())
        .filter(|line| !line.is_empty())
        .collect();
    if lines.is_empty() || !duration.is_finite() || duration <= 0.0 {
        return Vec::new();
    }

    let weights: Vec<usize> = lines.iter().map(|line| line.chars().count()).collect();
    let total: usize = weights.iter().sum();

    let mut windows = Vec::with_capacity(lines.len());
    let mut consumed = 0usize;
    let mut start = 0.0;
    let last = lines.len() - 1;

    for (idx, (line, weight)) in lines.iter().zip(&weights).enumerate() {
        consumed += weight;
        // Ends come from the cumulative share so rounding never accumulates; the final line
        // absorbs whatever remains.
        let end = if idx == last {
            duration
        } else {
            (duration * consumed as f64 / total as f64).clamp(start, duration)
        };
        windows.push(CaptionWindow {
            text: (*line).to_string(),
            start,
            end,
        });
        start = end;
    }

    windows
}
