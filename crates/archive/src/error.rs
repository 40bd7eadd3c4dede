//! Archive Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction, following the same layout as every other crate in the
//! workspace.

use derive_more::{Display, Error};

/// An archive error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The container signature is invalid or its structure could not be read.
    /// Don't retry with the same input.
    #[display("invalid or corrupted archive: {_0}")]
    Corrupt(#[error(not(source))] String),
    /// The file name does not map to any container format.
    #[display("unsupported archive format: {_0}")]
    UnsupportedFormat(#[error(not(source))] String),
    /// A member path is absolute, escapes the extraction root, or is empty.
    #[display("invalid member path: {_0}")]
    InvalidPath(#[error(not(source))] String),
    /// An I/O operation on the scratch directory failed.
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exn::ResultExt;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::Corrupt("bad header".to_string()).to_string(), "invalid or corrupted archive: bad header");
        assert_eq!(ErrorKind::UnsupportedFormat("x.rar".to_string()).to_string(), "unsupported archive format: x.rar");
        assert_eq!(ErrorKind::Io.to_string(), "I/O error");
    }

    #[test]
    fn error_kind_retryable() {
        assert!(!ErrorKind::Corrupt(String::new()).is_retryable());
        assert!(!ErrorKind::InvalidPath("../x".to_string()).is_retryable());
        assert!(ErrorKind::Io.is_retryable());
    }

    #[test]
    fn error_from_io() {
        let result: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope"));
        let err: Result<()> = result.or_raise(|| ErrorKind::Io);
        assert_eq!(*err.unwrap_err(), ErrorKind::Io);
    }
}
