//! File discovery.
//!
//! A [`Scanner`] walks a root directory (or checks an explicit file list) and
//! yields the paths worth extracting. [`ScanSummary`] aggregates what was
//! found, per extension.

pub mod error;
mod patterns;
mod scanner;
mod summary;

pub use self::patterns::SkipPatterns;
pub use self::scanner::{ScanOptions, Scanner};
pub use self::summary::{ExtensionStats, ScanSummary, human_size};
