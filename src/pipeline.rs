use std::time::Duration;

use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{ClipError, ClipResult};
use crate::raster::frame::FrameRGBA;

/// Anything that can render the clip at a point in time.
pub trait FrameSource {
    fn frame_at(&mut self, time: Duration) -> ClipResult<FrameRGBA>;
}

impl<F> FrameSource for F
where
    F: FnMut(Duration) -> ClipResult<FrameRGBA>,
{
    fn frame_at(&mut self, time: Duration) -> ClipResult<FrameRGBA> {
        self(time)
    }
}

/// Timestamp of frame `index` at `fps`.
pub fn frame_time(index: u64, fps: u32) -> Duration {
    let nanos = u128::from(index) * 1_000_000_000 / u128::from(fps.max(1));
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

/// Render `cfg.frame_count` frames from `source` into `sink`.
///
/// Frame `i` is rendered at `i / fps` seconds. `end` is only called when every frame was
/// pushed. Returns the number of frames pushed.
pub fn drive_clip(
    source: &mut dyn FrameSource,
    sink: &mut dyn FrameSink,
    cfg: SinkConfig,
) -> ClipResult<u64> {
    cfg.validate()?;
    if cfg.frame_count == 0 {
        return Err(ClipError::validation("drive_clip needs at least one frame"));
    }

    sink.begin(cfg)?;
    for i in 0..u64::from(cfg.frame_count) {
        let frame = source.frame_at(frame_time(i, cfg.fps))?;
        sink.push_frame(FrameIndex(i), &frame)?;
    }
    sink.end()?;

    tracing::debug!(frames = cfg.frame_count, fps = cfg.fps, "drove clip");
    Ok(u64::from(cfg.frame_count))
}

#[cfg(test)]
#[path = "../tests/unit/pipeline.rs"]
mod tests;
