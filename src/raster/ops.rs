use std::borrow::Cow;

use crate::foundation::core::SubRect;
use crate::raster::frame::FrameRGBA;

/// Smallest rectangle covering every pixel that differs between `previous` and `next`.
///
/// The two frames are compared over their combined bounds; a pixel that exists in only one of
/// them counts as changed. Returns `None` when the frames are identical.
pub fn smallest_diff_rect(previous: &FrameRGBA, next: &FrameRGBA) -> Option<SubRect> {
    let max_w = previous.width.max(next.width);
    let max_h = previous.height.max(next.height);

    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for y in 0..max_h {
        for x in 0..max_w {
            if previous.pixel(x, y) == next.pixel(x, y) {
                continue;
            }
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((l, t, r, b)) => (l.min(x), t.min(y), r.max(x), b.max(y)),
            });
        }
    }

    bounds.map(|(left, top, right, bottom)| SubRect {
        x: left,
        y: top,
        width: right - left + 1,
        height: bottom - top + 1,
    })
}

/// Extend both frames to their shared maximum bounds so neither is cropped.
pub fn resize_to_common<'a>(
    first: &'a FrameRGBA,
    second: &'a FrameRGBA,
) -> (Cow<'a, FrameRGBA>, Cow<'a, FrameRGBA>) {
    let canvas = first.canvas().union(second.canvas());
    (
        fit(first, canvas.width, canvas.height),
        fit(second, canvas.width, canvas.height),
    )
}

fn fit(frame: &FrameRGBA, width: u32, height: u32) -> Cow<'_, FrameRGBA> {
    if frame.width == width && frame.height == height {
        Cow::Borrowed(frame)
    } else {
        Cow::Owned(frame.extend_canvas(width, height))
    }
}

/// Stand-in for a frame that is missing from one of the two clips.
///
/// Opaque black with both diagonals in white, so it never matches a genuine black frame.
pub fn blank_placeholder(width: u32, height: u32) -> FrameRGBA {
    let mut frame = FrameRGBA::filled_rgb(width, height, [0, 0, 0]);
    if width == 0 || height == 0 {
        return frame;
    }
    let steps = width.max(height);
    for i in 0..steps {
        let x = scale(i, steps, width);
        let y = scale(i, steps, height);
        frame.set_pixel(x, y, [255, 255, 255, 255]);
        frame.set_pixel(width - 1 - x, y, [255, 255, 255, 255]);
    }
    frame
}

fn scale(i: u32, steps: u32, extent: u32) -> u32 {
    if steps <= 1 {
        return 0;
    }
    ((u64::from(i) * u64::from(extent - 1)) / u64::from(steps - 1)) as u32
}

#[cfg(test)]
#[path = "../../tests/unit/raster/ops.rs"]
mod tests;
