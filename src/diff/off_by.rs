use crate::diff::{AlphaPolicy, DiffResult, Differ, PixelVerdict, diff_with};
use crate::foundation::error::ClipResult;
use crate::raster::frame::FrameRGBA;

/// Tolerant differ: pixels whose RGBA channels all lie within `tolerance` of each other are
/// reported as similar instead of different.
///
/// Anti-aliasing and dithering often move a few channels by one or two levels between otherwise
/// identical renders.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OffBy {
    pub tolerance: u8,
    pub policy: AlphaPolicy,
}

impl OffBy {
    pub fn new(tolerance: u8, policy: AlphaPolicy) -> Self {
        Self { tolerance, policy }
    }
}

impl Default for OffBy {
    fn default() -> Self {
        Self::new(2, AlphaPolicy::default())
    }
}

impl Differ for OffBy {
    fn compare(&self, expected: &FrameRGBA, actual: &FrameRGBA) -> ClipResult<DiffResult> {
        let Self { tolerance, policy } = *self;
        diff_with(expected, actual, |e, a| {
            if policy.equivalent(e, a) {
                PixelVerdict::Equivalent
            } else if (0..4).all(|c| e[c].abs_diff(a[c]) <= tolerance) {
                PixelVerdict::Similar
            } else {
                PixelVerdict::Different
            }
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/diff/off_by.rs"]
mod tests;
