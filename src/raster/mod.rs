//! In-memory raster frames and the canvas operations shared by the codec and the differs.

/// Owned RGBA8 frame type.
pub mod frame;
/// Diff rectangles, common-bounds resizing and placeholder frames.
pub mod ops;
