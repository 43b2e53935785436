//! Verification of rendered output against goldens.

/// Streaming clip verifier.
pub mod clip;
/// Frame-rate alignment of golden and rendered clips.
pub mod reconcile;
/// Failure reports.
pub mod report;
/// Single-image verification.
pub mod snapshot;
