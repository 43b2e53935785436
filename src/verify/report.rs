use std::path::{Path, PathBuf};

/// Aggregate verdict of a failed verification run.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct VerificationFailure {
    /// Multi-line human readable summary; also the `Display` output.
    pub summary: String,
    /// Delta artifact written for this failure.
    pub artifact: PathBuf,
    /// Percent difference of every frame over the threshold, in timeline order.
    pub mismatched_frames: Vec<f32>,
    /// Threshold the run was checked against, in percent.
    pub max_percent_difference: f64,
    /// `(golden, actual)` fps when they differ.
    pub fps_mismatch: Option<(u32, u32)>,
    /// `(golden, actual)` frame counts when they differ.
    pub frame_count_mismatch: Option<(u64, u64)>,
}

impl VerificationFailure {
    pub fn new(artifact: impl Into<PathBuf>, max_percent_difference: f64) -> Self {
        Self {
            summary: String::new(),
            artifact: artifact.into(),
            mismatched_frames: Vec::new(),
            max_percent_difference,
            fps_mismatch: None,
            frame_count_mismatch: None,
        }
    }

    pub fn with_mismatches(mut self, frames: Vec<f32>) -> Self {
        self.mismatched_frames = frames;
        self
    }

    pub fn with_fps_mismatch(mut self, golden: u32, actual: u32) -> Self {
        self.fps_mismatch = (golden != actual).then_some((golden, actual));
        self
    }

    pub fn with_frame_count_mismatch(mut self, golden: u64, actual: u64) -> Self {
        self.frame_count_mismatch = Some((golden, actual));
        self
    }

    /// Whether any failure condition was recorded.
    pub fn has_failures(&self) -> bool {
        !self.mismatched_frames.is_empty()
            || self.fps_mismatch.is_some()
            || self.frame_count_mismatch.is_some()
    }

    pub fn artifact(&self) -> &Path {
        &self.artifact
    }

    /// Render `summary` from the recorded conditions.
    pub fn finalize(mut self) -> Self {
        let mut lines = Vec::new();
        let n = self.mismatched_frames.len();
        if n > 0 {
            let noun = if n == 1 { "frame" } else { "frames" };
            lines.push(format!(
                "{n} {noun} differed by more than {:.1}%",
                self.max_percent_difference
            ));
        }
        if let Some((golden, actual)) = self.fps_mismatch {
            lines.push(format!(
                "Mismatched video fps expected: {golden} actual: {actual}"
            ));
        }
        if let Some((golden, actual)) = self.frame_count_mismatch {
            lines.push(format!(
                "Mismatched frame count expected: {golden} actual: {actual}"
            ));
        }
        lines.push(format!(
            " - see details in file://{}",
            self.artifact.display()
        ));
        self.summary = lines.join("\n");
        self
    }
}

impl std::fmt::Display for VerificationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.summary)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/verify/report.rs"]
mod tests;
