//! Core error types for vmigrate operations.
//!
//! All errors are explicit, typed, and recoverable - no panics allowed.

use std::path::PathBuf;

use thiserror::Error;

/// The standard Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for naming and configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    // Naming errors
    #[error("name '{raw}' has no characters left after normalization")]
    EmptyName { raw: String },

    #[error("invalid naming constraint: {reason}")]
    InvalidConstraint { reason: String },

    // Document loading errors
    #[error("failed to read file '{path}': {reason}")]
    FileReadFailed { path: PathBuf, reason: String },

    #[error("failed to parse '{path}': {reason}")]
    ParseFailed { path: PathBuf, reason: String },
}

impl Error {
    /// Create an empty name error.
    pub fn empty_name(raw: impl Into<String>) -> Self {
        Self::EmptyName { raw: raw.into() }
    }

    /// Create an invalid constraint error.
    pub fn invalid_constraint(reason: impl Into<String>) -> Self {
        Self::InvalidConstraint {
            reason: reason.into(),
        }
    }

    /// Create a file read error.
    pub fn file_read_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::FileReadFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a parse error.
    pub fn parse_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ParseFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error came from normalizing a name down to nothing.
    pub const fn is_empty_name(&self) -> bool {
        matches!(self, Self::EmptyName { .. })
    }
}
