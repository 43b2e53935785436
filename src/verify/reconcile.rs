use crate::foundation::error::{ClipError, ClipResult};
use crate::foundation::math::lcm_u64;

/// Aligns a golden clip and an actual clip recorded at different frame rates.
///
/// Both clips are mapped onto a common timeline ticking at `lcm(expected_fps, actual_fps)`.
/// One golden frame lasts `expected_step` ticks and one actual frame lasts `actual_step` ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameRateReconciler {
    expected_fps: u32,
    actual_fps: u32,
    common: u64,
    expected_step: u64,
    actual_step: u64,
}

impl FrameRateReconciler {
    pub fn new(expected_fps: u32, actual_fps: u32) -> ClipResult<Self> {
        if expected_fps == 0 || actual_fps == 0 {
            return Err(ClipError::validation(format!(
                "frame rates must be > 0 (expected {expected_fps}, actual {actual_fps})"
            )));
        }
        let common = lcm_u64(u64::from(expected_fps), u64::from(actual_fps));
        Ok(Self {
            expected_fps,
            actual_fps,
            common,
            expected_step: common / u64::from(expected_fps),
            actual_step: common / u64::from(actual_fps),
        })
    }

    pub fn expected_fps(&self) -> u32 {
        self.expected_fps
    }

    pub fn actual_fps(&self) -> u32 {
        self.actual_fps
    }

    /// Ticks per second of the common timeline.
    pub fn common_rate(&self) -> u64 {
        self.common
    }

    /// Ticks covered by one golden frame.
    pub fn expected_step(&self) -> u64 {
        self.expected_step
    }

    /// Ticks covered by one actual frame.
    pub fn actual_step(&self) -> u64 {
        self.actual_step
    }

    /// Golden frame on screen at `tick`.
    pub fn golden_index_at(&self, tick: u64) -> u64 {
        tick / self.expected_step
    }

    /// First tick of actual frame `index`.
    pub fn actual_tick(&self, index: u64) -> u64 {
        index * self.actual_step
    }

    pub fn rates_match(&self) -> bool {
        self.expected_fps == self.actual_fps
    }
}

#[cfg(test)]
#[path = "../../tests/unit/verify/reconcile.rs"]
mod tests;
