//! clipcheck records rendered frames into APNG clips and verifies them against goldens.
//!
//! A renderer (outside this crate) produces raster frames at a fixed frame rate. clipcheck
//! stores them as sub-rectangle delta APNGs, decodes golden clips frame by frame, compares
//! frames with a pluggable pixel [`Differ`], lines up clips recorded at different frame rates,
//! and on failure writes a delta clip a human can step through.
//!
//! # Pipeline overview
//!
//! 1. **Record**: [`ApngWriter`] (or [`drive_clip`] with any [`FrameSource`]) writes a golden.
//! 2. **Verify**: [`ApngVerifier`] streams rendered frames against the golden on a common
//!    timeline built by [`FrameRateReconciler`].
//! 3. **Report**: [`ApngVerifier::assert_finished`] returns `Ok(())` or a
//!    [`ClipError::Verification`] carrying a [`VerificationFailure`] and the delta artifact path.
//!
//! Single still images go through [`verify_snapshot`] instead.
//!
//! The library logs through `tracing` and never installs a subscriber.
#![forbid(unsafe_code)]

mod apng;
mod config;
mod diff;
mod encode;
mod foundation;
mod pipeline;
mod raster;
mod verify;

pub use apng::chunk::{
    BIT_DEPTH, COLOR_TYPE_RGB, COLOR_TYPE_RGBA, Chunk, ChunkTag, PNG_SIGNATURE, read_chunk,
    write_chunk,
};
pub use apng::reader::ApngReader;
pub use apng::writer::ApngWriter;
pub use config::{DEFAULT_FAILURE_DIR, DifferConfig, VerifyConfig};
pub use diff::{
    AlphaPolicy, DELTA_EQUIVALENT, DELTA_SIMILAR, DeltaE, DiffResult, Differ, Mssim, OffBy,
    PixelPerfect, compare_frames,
};
pub use encode::sink::{FrameSink, InMemorySink, SinkConfig, ensure_parent_dir};
pub use foundation::core::{Canvas, FrameDelay, FrameIndex, SubRect};
pub use foundation::error::{ClipError, ClipResult};
pub use pipeline::{FrameSource, drive_clip, frame_time};
pub use raster::frame::FrameRGBA;
pub use raster::ops::{blank_placeholder, resize_to_common, smallest_diff_rect};
pub use verify::clip::{ApngVerifier, VerifyOptions};
pub use verify::reconcile::FrameRateReconciler;
pub use verify::report::VerificationFailure;
pub use verify::snapshot::{SnapshotOptions, verify_snapshot, verify_snapshot_file};
