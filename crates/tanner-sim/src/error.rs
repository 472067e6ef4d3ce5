//! Errors raised by the simulation harness.
//!
//! Every variant ends the run. A frame that fails to decode is a statistic,
//! never an error.

use tanner_core::TannerError;

/// Result type for harness operations
pub type SimResult<T> = Result<T, SimError>;

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error(transparent)]
    Core(#[from] TannerError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("codeword file line {line}: {message}")]
    Codeword { line: usize, message: String },

    #[error("invalid simulation configuration: {0}")]
    InvalidConfig(String),

    #[error("{path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SimError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Attach the offending path to an I/O error.
    pub(crate) fn file(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::File {
            path: path.display().to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_passes_through() {
        let err: SimError = TannerError::InvalidConfig("phases must be at least 1".into()).into();
        assert_eq!(
            err.to_string(),
            "invalid decoder configuration: phases must be at least 1"
        );
    }

    #[test]
    fn test_file_error_names_path() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        let err = SimError::file(std::path::Path::new("codes/h.alist"), io);
        assert_eq!(err.to_string(), "codes/h.alist: not found");
    }
}
