//! Pixel differs.
//!
//! A [`Differ`] compares two equal-sized frames and returns a [`DiffResult`] whose `delta` is a
//! side-by-side `expected | delta map | actual` image for humans to inspect.

use crate::foundation::error::{ClipError, ClipResult};
use crate::foundation::math::composite_over;
use crate::raster::frame::FrameRGBA;
use crate::raster::ops::resize_to_common;

mod delta_e;
mod mssim;
mod off_by;
mod pixel_perfect;

pub use delta_e::DeltaE;
pub use mssim::Mssim;
pub use off_by::OffBy;
pub use pixel_perfect::PixelPerfect;

/// Delta map color for equivalent pixels.
pub const DELTA_EQUIVALENT: [u8; 4] = [128, 128, 128, 0];
/// Delta map color for pixels a tolerant differ accepted as close enough.
pub const DELTA_SIMILAR: [u8; 4] = [0, 0, 255, 255];

/// Pluggable frame comparison.
pub trait Differ: Send + Sync + std::fmt::Debug {
    /// Compare two frames of identical dimensions.
    fn compare(&self, expected: &FrameRGBA, actual: &FrameRGBA) -> ClipResult<DiffResult>;
}

impl<D: Differ + ?Sized> Differ for Box<D> {
    fn compare(&self, expected: &FrameRGBA, actual: &FrameRGBA) -> ClipResult<DiffResult> {
        (**self).compare(expected, actual)
    }
}

/// Outcome of one comparison.
#[derive(Clone, Debug)]
pub struct DiffResult {
    /// `expected | delta map | actual`, three times the input width.
    pub delta: FrameRGBA,
    /// Share of pixels counted as different, in percent (`0.0..=100.0`).
    pub percent_different: f32,
    pub different_pixels: u64,
    pub similar_pixels: u64,
}

impl DiffResult {
    /// No pixel was counted as different.
    pub fn is_identical(&self) -> bool {
        self.different_pixels == 0
    }
}

/// How pixels with partial transparency are judged equivalent.
///
/// Two fully transparent pixels are equivalent under every policy, whatever their color bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AlphaPolicy {
    /// Exact RGBA equality.
    Strict,
    /// Equal alpha, and equal RGB once both pixels are composited over `background`.
    Composite {
        #[serde(default = "default_background")]
        background: [u8; 3],
    },
}

fn default_background() -> [u8; 3] {
    [128, 128, 128]
}

impl Default for AlphaPolicy {
    fn default() -> Self {
        Self::Composite {
            background: default_background(),
        }
    }
}

impl AlphaPolicy {
    /// Whether `a` and `b` should be treated as the same pixel.
    pub fn equivalent(self, a: [u8; 4], b: [u8; 4]) -> bool {
        if a == b || (a[3] == 0 && b[3] == 0) {
            return true;
        }
        match self {
            Self::Strict => false,
            Self::Composite { background } => {
                a[3] == b[3]
                    && (0..3).all(|c| {
                        composite_over(a[c], a[3], background[c])
                            == composite_over(b[c], b[3], background[c])
                    })
            }
        }
    }
}

/// Per-pixel verdict produced by a differ's classifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PixelVerdict {
    Equivalent,
    Similar,
    Different,
}

/// Walk both frames, classify each pixel pair and assemble the side-by-side delta image.
pub(crate) fn diff_with(
    expected: &FrameRGBA,
    actual: &FrameRGBA,
    mut classify: impl FnMut([u8; 4], [u8; 4]) -> PixelVerdict,
) -> ClipResult<DiffResult> {
    diff_at(expected, actual, |_, _, e, a| classify(e, a))
}

/// Like [`diff_with`], also passing the pixel position to `classify`.
pub(crate) fn diff_at(
    expected: &FrameRGBA,
    actual: &FrameRGBA,
    mut classify: impl FnMut(u32, u32, [u8; 4], [u8; 4]) -> PixelVerdict,
) -> ClipResult<DiffResult> {
    if expected.width != actual.width || expected.height != actual.height {
        return Err(ClipError::validation(format!(
            "cannot diff {}x{} against {}x{}; resize to common bounds first",
            expected.width, expected.height, actual.width, actual.height
        )));
    }

    let (w, h) = (expected.width, expected.height);
    let mut delta = FrameRGBA::transparent(w * 3, h);
    delta.blit(expected, 0, 0);
    delta.blit(actual, w * 2, 0);
    delta.has_alpha = true;

    let mut different = 0u64;
    let mut similar = 0u64;
    for (i, (e, a)) in expected
        .data
        .chunks_exact(4)
        .zip(actual.data.chunks_exact(4))
        .enumerate()
    {
        let x = (i % w as usize) as u32;
        let y = (i / w as usize) as u32;
        let e = [e[0], e[1], e[2], e[3]];
        let a = [a[0], a[1], a[2], a[3]];
        let color = match classify(x, y, e, a) {
            PixelVerdict::Equivalent => DELTA_EQUIVALENT,
            PixelVerdict::Similar => {
                similar += 1;
                DELTA_SIMILAR
            }
            PixelVerdict::Different => {
                different += 1;
                delta_color(e, a)
            }
        };
        delta.set_pixel(w + x, y, color);
    }

    let total = u64::from(w) * u64::from(h);
    let percent_different = if total == 0 {
        0.0
    } else {
        (different as f64 * 100.0 / total as f64) as f32
    };

    Ok(DiffResult {
        delta,
        percent_different,
        different_pixels: different,
        similar_pixels: similar,
    })
}

/// Signed channel difference re-centred on mid gray.
fn delta_color(expected: [u8; 4], actual: [u8; 4]) -> [u8; 4] {
    let ch = |c: usize| 128u8.wrapping_add(actual[c].wrapping_sub(expected[c]));
    [ch(0), ch(1), ch(2), 255]
}

/// Resize both frames to their common bounds, then compare.
pub fn compare_frames(
    differ: &dyn Differ,
    expected: &FrameRGBA,
    actual: &FrameRGBA,
) -> ClipResult<DiffResult> {
    let (expected, actual) = resize_to_common(expected, actual);
    differ.compare(&expected, &actual)
}

#[cfg(test)]
#[path = "../../tests/unit/diff/differ.rs"]
mod tests;
