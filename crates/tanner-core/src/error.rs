//! Error type shared by the graph loader, channel front end and decoders.
//!
//! Decoder non-convergence is not an error: it is reported through
//! [`FrameOutcome::satisfied`](crate::decoder::FrameOutcome) and counted by
//! the caller. Everything here is structural and ends the run.

/// Result type for tanner-core operations
pub type TannerResult<T> = Result<T, TannerError>;

/// Errors that can occur while loading graphs or configuring decoders
#[derive(Debug, thiserror::Error)]
pub enum TannerError {
    #[error("alist parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("inconsistent graph: {0}")]
    Inconsistent(String),

    #[error("invalid decoder configuration: {0}")]
    InvalidConfig(String),

    #[error("length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("unsupported field order {0}; must be a power of two in 2..=256")]
    UnsupportedField(u32),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TannerError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    pub(crate) fn check_len(expected: usize, actual: usize) -> TannerResult<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(Self::LengthMismatch { expected, actual })
        }
    }
}
