//! Error types for datalib

use thiserror::Error;

use crate::hash::{ResourceHash, TypeHash};

/// Main error type for DL operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[source] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Truncated data: {0}")]
    Truncated(String),

    #[error("Corrupt DL format: {0}")]
    CorruptFormat(String),

    #[error(
        "Format assumption violated for type {type_hash}{}: expected {expected}, found {observed}",
        .member.map(|m| format!(" (member {})", m)).unwrap_or_default()
    )]
    FormatAssumptionViolated {
        /// Type whose declared layout no longer matches
        type_hash: TypeHash,
        /// Offending member, `None` for type-level checks
        member: Option<usize>,
        expected: String,
        observed: String,
    },

    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(ResourceHash),
}

impl Error {
    /// Whether this is the recoverable "absent" class of error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    pub(crate) fn violated(
        type_hash: TypeHash,
        member: Option<usize>,
        expected: impl ToString,
        observed: impl ToString,
    ) -> Self {
        Error::FormatAssumptionViolated {
            type_hash,
            member,
            expected: expected.to_string(),
            observed: observed.to_string(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof => Error::Truncated(err.to_string()),
            _ => Error::Io(err),
        }
    }
}

/// Result type alias for DL operations
pub type Result<T> = std::result::Result<T, Error>;
