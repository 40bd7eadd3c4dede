//! Directory-to-document extraction.
//!
//! [`Pipeline::discover`] walks a source with the [`Scanner`],
//! [`Pipeline::run`] extracts every file concurrently (expanding archives
//! back into the same run) and the results end up in one
//! [`OutputDocument`].

mod aggregate;
mod dispatch;
pub mod error;
mod expand;
mod pipeline;
mod progress;
pub mod scan;
mod task;

pub use crate::aggregate::{Aggregator, OutputDocument, RunMetadata};
pub use crate::dispatch::{resolve, supported_extensions};
pub use crate::expand::ArchiveExpander;
pub use crate::pipeline::{Pipeline, PipelineEvent, RunReport};
pub use crate::progress::{Outcome, ProgressSnapshot, ProgressTracker};
pub use crate::scan::{ScanOptions, ScanSummary, Scanner, SkipPatterns, human_size};
pub use crate::task::{ArchiveScope, FileTask, TaskSubmitter};
