//! Result and error types for srcprof.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for srcprof operations
pub type ProfResult<T> = Result<T, ProfError>;

/// Errors that can occur while instrumenting sources or aggregating counts
#[derive(Debug, Error)]
pub enum ProfError {
    /// Source text could not be turned into a syntax tree
    #[error("{}:{line}: parse error: {message}", path.display())]
    Parse {
        /// File being parsed
        path: PathBuf,
        /// 1-based line of the offending token
        line: u32,
        /// Error message
        message: String,
    },

    /// The syntax tree could not be turned into a consistent block inventory
    #[error("{}: block extraction failed: {message}", path.display())]
    Extraction {
        /// File being extracted
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// A counts snapshot does not match the metadata it is paired with
    #[error("counter count mismatch: metadata declares {expected} counters but snapshot has {actual}")]
    CountMismatch {
        /// Counter count from the metadata
        expected: usize,
        /// Counter count found in the snapshot
        actual: usize,
    },

    /// A required input file does not exist
    #[error("missing input file: {}", path.display())]
    MissingInput {
        /// Path that was expected
        path: PathBuf,
    },

    /// Malformed counts snapshot
    #[error("invalid snapshot: {message}")]
    Snapshot {
        /// Error message
        message: String,
    },

    /// Malformed or incompatible metadata
    #[error("invalid metadata: {message}")]
    Metadata {
        /// Error message
        message: String,
    },

    /// Invalid state error (operation called in wrong state)
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Error message
        message: String,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProfError {
    /// Create a parse error
    #[must_use]
    pub fn parse(path: impl Into<PathBuf>, line: u32, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    /// Create an extraction error
    #[must_use]
    pub fn extraction(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Extraction {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a snapshot format error
    #[must_use]
    pub fn snapshot(message: impl Into<String>) -> Self {
        Self::Snapshot {
            message: message.into(),
        }
    }

    /// Create a metadata format error
    #[must_use]
    pub fn metadata(message: impl Into<String>) -> Self {
        Self::Metadata {
            message: message.into(),
        }
    }

    /// Create an invalid state error
    #[must_use]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Whether this error only affects a single source file.
    ///
    /// Batch instrumentation skips such files instead of aborting.
    #[must_use]
    pub const fn is_file_scoped(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::Extraction { .. })
    }
}
