use crate::diff::{AlphaPolicy, DiffResult, Differ, PixelVerdict, diff_with};
use crate::foundation::error::ClipResult;
use crate::raster::frame::FrameRGBA;

/// Counts every non-equivalent pixel as different.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PixelPerfect {
    pub policy: AlphaPolicy,
}

impl PixelPerfect {
    pub fn new(policy: AlphaPolicy) -> Self {
        Self { policy }
    }
}

impl Differ for PixelPerfect {
    fn compare(&self, expected: &FrameRGBA, actual: &FrameRGBA) -> ClipResult<DiffResult> {
        let policy = self.policy;
        diff_with(expected, actual, |e, a| {
            if policy.equivalent(e, a) {
                PixelVerdict::Equivalent
            } else {
                PixelVerdict::Different
            }
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/diff/pixel_perfect.rs"]
mod tests;
