//! Animated PNG container support.
//!
//! Only the subset needed to store screenshot clips is implemented: 8-bit RGB/RGBA, filter type
//! 0, one image-data chunk per frame, and sub-rectangle delta frames composited with
//! dispose/blend op 0.

/// Signature, chunk framing, CRC and zlib helpers.
pub mod chunk;
/// Streaming decoder.
pub mod reader;
/// Delta-encoding writer.
pub mod writer;
