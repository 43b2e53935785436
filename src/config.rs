use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::diff::{AlphaPolicy, DeltaE, Differ, Mssim, OffBy, PixelPerfect};
use crate::foundation::error::{ClipError, ClipResult};
use crate::verify::snapshot::SnapshotOptions;

/// Default directory for delta and actual images of failed runs.
pub const DEFAULT_FAILURE_DIR: &str = "build/clipcheck/failures";

/// Which differ a run uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DifferConfig {
    #[default]
    PixelPerfect,
    OffBy {
        tolerance: u8,
    },
    /// Local SSIM at or above `threshold` is similar.
    Mssim {
        #[serde(default = "default_ssim_threshold")]
        threshold: f64,
    },
    /// CIEDE2000 distance at or below `threshold` is similar.
    DeltaE {
        #[serde(default = "default_delta_e_threshold")]
        threshold: f64,
    },
}

fn default_ssim_threshold() -> f64 {
    Mssim::default().threshold
}

fn default_delta_e_threshold() -> f64 {
    DeltaE::JUST_NOTICEABLE
}

/// JSON-facing settings for verification runs.
///
/// Every field has a default, so `{}` is a valid configuration.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerifyConfig {
    /// Largest accepted per-frame difference, in percent.
    pub max_percent_difference: f64,
    pub failure_dir: PathBuf,
    pub differ: DifferConfig,
    pub alpha: AlphaPolicy,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            max_percent_difference: 0.0,
            failure_dir: PathBuf::from(DEFAULT_FAILURE_DIR),
            differ: DifferConfig::default(),
            alpha: AlphaPolicy::default(),
        }
    }
}

impl VerifyConfig {
    /// Parse a configuration from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> ClipResult<Self> {
        let cfg: VerifyConfig = serde_json::from_reader(r)
            .map_err(|e| ClipError::validation(format!("parse verify config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a configuration from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> ClipResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            ClipError::validation(format!("open verify config '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    pub fn validate(&self) -> ClipResult<()> {
        let max = self.max_percent_difference;
        if !max.is_finite() || max < 0.0 {
            return Err(ClipError::validation(format!(
                "max_percent_difference must be a finite non-negative number, got {max}"
            )));
        }
        if max > 100.0 {
            return Err(ClipError::validation(format!(
                "max_percent_difference must be <= 100, got {max}"
            )));
        }
        if self.failure_dir.as_os_str().is_empty() {
            return Err(ClipError::validation("failure_dir must not be empty"));
        }
        match self.differ {
            DifferConfig::Mssim { threshold } if !(-1.0..=1.0).contains(&threshold) => {
                Err(ClipError::validation(format!(
                    "mssim threshold must be within -1..=1, got {threshold}"
                )))
            }
            DifferConfig::DeltaE { threshold } if !threshold.is_finite() || threshold < 0.0 => {
                Err(ClipError::validation(format!(
                    "delta_e threshold must be a finite non-negative number, got {threshold}"
                )))
            }
            _ => Ok(()),
        }
    }

    pub fn build_differ(&self) -> Box<dyn Differ> {
        match self.differ {
            DifferConfig::PixelPerfect => Box::new(PixelPerfect::new(self.alpha)),
            DifferConfig::OffBy { tolerance } => Box::new(OffBy::new(tolerance, self.alpha)),
            DifferConfig::Mssim { threshold } => Box::new(Mssim::new(threshold, self.alpha)),
            DifferConfig::DeltaE { threshold } => Box::new(DeltaE::new(threshold, self.alpha)),
        }
    }

    pub fn snapshot_options(&self) -> SnapshotOptions {
        SnapshotOptions {
            failure_dir: self.failure_dir.clone(),
            max_percent_difference: self.max_percent_difference,
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
