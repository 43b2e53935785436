use std::path::{Path, PathBuf};

use crate::diff::{Differ, compare_frames};
use crate::foundation::error::{ClipError, ClipResult};
use crate::raster::frame::FrameRGBA;
use crate::verify::report::VerificationFailure;

/// Where and how strictly single images are checked.
#[derive(Clone, Debug, PartialEq)]
pub struct SnapshotOptions {
    /// Directory receiving `delta-<name>` and `<name>` on failure.
    pub failure_dir: PathBuf,
    /// Largest accepted difference, in percent.
    pub max_percent_difference: f64,
}

/// Compare a rendered image with its golden.
///
/// Fails when the difference exceeds the threshold or when width or height differ by two pixels
/// or more. On failure the delta image and the rendered image are written to
/// `options.failure_dir`, replacing older files of the same name.
#[tracing::instrument(skip(golden, actual, options, differ))]
pub fn verify_snapshot(
    name: &str,
    golden: &FrameRGBA,
    actual: &FrameRGBA,
    options: &SnapshotOptions,
    differ: &dyn Differ,
) -> ClipResult<()> {
    if name.is_empty() || name.contains(['/', '\\']) {
        return Err(ClipError::validation(format!(
            "snapshot name '{name}' must be a bare file name"
        )));
    }

    let result = compare_frames(differ, golden, actual)?;
    let percent = result.percent_different;
    let size = |f: &FrameRGBA| format!("{}x{}", f.width, f.height);

    let reason = if f64::from(percent) > options.max_percent_difference {
        Some(format!("Images differ (by {percent:.6}%)"))
    } else if golden.width.abs_diff(actual.width) >= 2 {
        Some(format!(
            "Widths differ too much for {name}: {} vs {}",
            size(golden),
            size(actual)
        ))
    } else if golden.height.abs_diff(actual.height) >= 2 {
        Some(format!(
            "Heights differ too much for {name}: {} vs {}",
            size(golden),
            size(actual)
        ))
    } else {
        None
    };

    let Some(reason) = reason else {
        tracing::debug!(percent, "snapshot matches golden");
        return Ok(());
    };

    let delta_path = options.failure_dir.join(format!("delta-{name}"));
    let actual_path = options.failure_dir.join(name);
    replace_png(&result.delta, &delta_path)?;
    replace_png(actual, &actual_path)?;

    let mut failure = VerificationFailure::new(&delta_path, options.max_percent_difference);
    if f64::from(percent) > options.max_percent_difference {
        failure = failure.with_mismatches(vec![percent]);
    }
    failure.summary = format!("{reason} - see details in file://{}", delta_path.display());
    tracing::warn!(snapshot = name, delta = %delta_path.display(), "{reason}");
    Err(failure.into())
}

/// Like [`verify_snapshot`], loading the golden from disk.
///
/// A missing golden is replaced by a fully transparent image the size of `actual`, so the run
/// still fails with a delta and the rendered image to promote.
pub fn verify_snapshot_file(
    golden_path: &Path,
    actual: &FrameRGBA,
    options: &SnapshotOptions,
    differ: &dyn Differ,
) -> ClipResult<()> {
    let name = golden_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            ClipError::validation(format!(
                "golden path '{}' has no file name",
                golden_path.display()
            ))
        })?;

    let golden = if golden_path.exists() {
        FrameRGBA::load_png(golden_path)?
    } else {
        tracing::warn!(golden = %golden_path.display(), "golden image not found");
        FrameRGBA::transparent(actual.width, actual.height)
    };
    verify_snapshot(name, &golden, actual, options, differ)
}

fn replace_png(frame: &FrameRGBA, path: &Path) -> ClipResult<()> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    frame.save_png(path)
}

#[cfg(test)]
#[path = "../../tests/unit/verify/snapshot.rs"]
mod tests;
