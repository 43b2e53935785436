use crate::verify::report::VerificationFailure;

/// Convenience result type used across clipcheck.
pub type ClipResult<T> = Result<T, ClipError>;

/// Top-level error taxonomy.
///
/// Every variant except [`ClipError::Verification`] is fatal: the bytes or the call sequence
/// cannot be trusted and the operation was aborted. `Verification` is the expected,
/// test-level outcome of comparing a render against its golden.
#[derive(thiserror::Error, Debug)]
pub enum ClipError {
    /// A chunk's trailing CRC did not match its tag and payload.
    #[error("format error: CRC mismatch decoding {chunk}, invalid data")]
    Crc {
        /// Tag of the offending chunk.
        chunk: String,
    },

    /// An fcTL/fdAT chunk did not carry the next sequence number.
    #[error("format error: out of order sequence, expected: {expected} actual: {actual}")]
    Sequence {
        /// Sequence number the reader expected.
        expected: u32,
        /// Sequence number found in the stream.
        actual: u32,
    },

    /// Malformed or unsupported container data.
    #[error("format error: {0}")]
    Format(String),

    /// Precondition violated by the caller.
    #[error("validation error: {0}")]
    Validation(String),

    /// Rendered output did not match its golden.
    #[error("{0}")]
    Verification(Box<VerificationFailure>),

    /// Underlying IO failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Wrapped lower-level error from dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ClipError {
    /// Build a [`ClipError::Format`] value.
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// Build a [`ClipError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ClipError::Crc`] value.
    pub fn crc(chunk: impl Into<String>) -> Self {
        Self::Crc {
            chunk: chunk.into(),
        }
    }

    /// `false` only for verification failures, which callers may report and continue past.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Verification(_))
    }

    /// Borrow the verification failure, if this is one.
    pub fn as_verification(&self) -> Option<&VerificationFailure> {
        match self {
            Self::Verification(failure) => Some(failure),
            _ => None,
        }
    }
}

impl From<VerificationFailure> for ClipError {
    fn from(failure: VerificationFailure) -> Self {
        Self::Verification(Box::new(failure))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
