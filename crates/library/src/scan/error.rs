//! Error types for the [`scan`](super) module.

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A configured skip pattern could not be compiled.
    #[display("invalid skip pattern: {_0}")]
    Pattern(#[error(not(source))] String),
}
