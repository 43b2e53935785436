use crate::foundation::error::{ClipError, ClipResult};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub fn area(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Smallest canvas containing both `self` and `other`.
    pub fn union(self, other: Canvas) -> Canvas {
        Canvas {
            width: self.width.max(other.width),
            height: self.height.max(other.height),
        }
    }
}

/// Rational per-frame delay in seconds (`num / den`), as stored in fcTL.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct FrameDelay {
    pub num: u16,
    pub den: u16,
}

impl FrameDelay {
    /// Delay reported before any fcTL chunk has been seen.
    pub const UNSPECIFIED: FrameDelay = FrameDelay { num: 0, den: 0 };

    /// `1 / fps` seconds. `fps` must fit the 16-bit delay denominator.
    pub fn from_fps(fps: u32) -> ClipResult<Self> {
        if fps == 0 {
            return Err(ClipError::validation("fps must be > 0"));
        }
        let den = u16::try_from(fps).map_err(|_| {
            ClipError::validation(format!("fps {fps} does not fit a 16-bit frame delay"))
        })?;
        Ok(Self { num: 1, den })
    }

    /// Whole frames-per-second, when `den` is a non-zero multiple of `num`.
    pub fn fps(self) -> Option<u32> {
        (self.num > 0 && self.den > 0 && self.den % self.num == 0)
            .then(|| u32::from(self.den / self.num))
    }

    pub fn is_unspecified(self) -> bool {
        self == Self::UNSPECIFIED
    }
}

impl Default for FrameDelay {
    fn default() -> Self {
        Self::UNSPECIFIED
    }
}

impl std::fmt::Display for FrameDelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Axis-aligned pixel rectangle; `x`/`y` are the top-left offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl SubRect {
    /// Degenerate region used when two consecutive frames are identical.
    pub const MIN: SubRect = SubRect {
        x: 0,
        y: 0,
        width: 1,
        height: 1,
    };

    pub fn full(canvas: Canvas) -> Self {
        Self {
            x: 0,
            y: 0,
            width: canvas.width,
            height: canvas.height,
        }
    }

    pub fn right(self) -> u64 {
        u64::from(self.x) + u64::from(self.width)
    }

    pub fn bottom(self) -> u64 {
        u64::from(self.y) + u64::from(self.height)
    }

    pub fn fits_within(self, canvas: Canvas) -> bool {
        self.right() <= u64::from(canvas.width) && self.bottom() <= u64::from(canvas.height)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
