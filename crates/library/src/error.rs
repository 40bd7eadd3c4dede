//! Library Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. Only a handful of these ever escape a run: a missing
//! root before any task exists, and a failure to persist the output
//! document. Everything that goes wrong for a single file becomes that
//! file's `error` result instead.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The root to scan does not exist or cannot be read.
    #[display("source not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    #[display("failed to scan source")]
    Scan,
    /// The output document could not be written. The results themselves
    /// were produced and are still counted.
    #[display("failed to persist {results} results")]
    Persist { results: usize },
    /// A worker task was cancelled or panicked outside the extraction boundary.
    #[display("worker task failed")]
    Join,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Persist { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::NotFound(PathBuf::from("/nope")).to_string(), "source not found: /nope");
        assert_eq!(ErrorKind::Persist { results: 12 }.to_string(), "failed to persist 12 results");
    }

    #[test]
    fn only_persistence_is_retryable() {
        assert!(ErrorKind::Persist { results: 0 }.is_retryable());
        assert!(!ErrorKind::NotFound(PathBuf::new()).is_retryable());
        assert!(!ErrorKind::Join.is_retryable());
    }
}
