//! Frame sinks.
//!
//! Sinks consume frames in timeline order. [`crate::ApngWriter`] records them into a clip and
//! [`crate::ApngVerifier`] checks them against a golden; both implement [`sink::FrameSink`].

/// Generic frame sink trait and built-in sinks.
pub mod sink;
