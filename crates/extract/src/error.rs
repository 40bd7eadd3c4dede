//! Extraction Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. A decoder returning any of these produces an `error`
//! result for its file; it never aborts the run.

use derive_more::{Display, Error};
use exn::Exn;

/// An extraction error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The file could not be read.
    #[display("I/O error")]
    Io,
    /// The bytes were read but could not be interpreted.
    #[display("failed to decode content: {_0}")]
    Decode(#[error(not(source))] String),
    /// The file's leading bytes do not match the format its extension claims.
    #[display("file signature does not match expected {_0} format")]
    Signature(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Content either decodes or it doesn't; only the filesystem is flaky.
        matches!(self, ErrorKind::Io)
    }
}

/// Render an error with every cause beneath it, outermost first.
///
/// `Display` on an [`Exn`] only shows the top frame, which for I/O failures
/// is a bare "I/O error". Result messages need the operating system's
/// reason as well: `I/O error: Is a directory (os error 21)`.
pub fn describe<E>(err: &Exn<E>) -> String
where
    E: std::error::Error + Send + Sync + 'static,
{
    let mut messages: Vec<String> = Vec::new();
    let mut frame = Some(err.frame());
    while let Some(current) = frame {
        let message = current.error().to_string();
        if messages.last() != Some(&message) {
            messages.push(message);
        }
        frame = current.children().first();
    }
    messages.join(": ")
}
