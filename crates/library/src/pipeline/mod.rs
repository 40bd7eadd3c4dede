//! The concurrent extraction pipeline.
//!
//! A fixed pool of async workers pulls [`FileTask`]s from one shared queue.
//! Every task is resolved to a capability and handed to a decoder (or the
//! archive expander) on the blocking thread pool, which doubles as the panic
//! boundary: whatever goes wrong with one file becomes that file's `error`
//! result. Archives feed their members back into the same queue, so the
//! queue grows while the run is in progress. The run ends once the queue is
//! empty and no worker is busy.

mod events;
mod queue;
mod worker;

use self::events::Observer;
pub use self::events::PipelineEvent;
use self::queue::TaskQueue;
use self::worker::Shared;
use crate::aggregate::Aggregator;
use crate::error::{ErrorKind, Result};
use crate::expand::ArchiveExpander;
use crate::progress::{ProgressSnapshot, ProgressTracker};
use crate::scan::{ScanOptions, Scanner};
use crate::task::FileTask;
use exn::ResultExt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use trawl_config::Config;
use trawl_extract::Decoders;
use trawl_extract::models::ExtractionResult;

/// Everything a finished (or cancelled) run produced.
#[derive(Debug)]
pub struct RunReport {
    /// In completion order.
    pub results: Vec<ExtractionResult>,
    pub progress: ProgressSnapshot,
    pub cancelled: bool,
    /// Tasks that were still queued when the run was cancelled.
    pub dropped: usize,
}

#[derive(Debug)]
pub struct Pipeline {
    workers: usize,
    scanner: Arc<Scanner>,
    decoders: Decoders,
    expander: ArchiveExpander,
    checksums: bool,
    cancel: CancellationToken,
    events: Option<mpsc::UnboundedSender<PipelineEvent>>,
}

impl Pipeline {
    pub fn new(config: &Config) -> Result<Self> {
        let scanner = Arc::new(Scanner::new(ScanOptions::from_config(config)?));
        let expander = ArchiveExpander::new(
            Arc::clone(&scanner),
            config.max_archive_depth,
            config.temp_dir.clone(),
            config.checksums,
            config.max_file_size,
        );
        Ok(Self {
            workers: config.workers.max(1),
            scanner,
            decoders: Decoders::default(),
            expander,
            checksums: config.checksums,
            cancel: CancellationToken::new(),
            events: None,
        })
    }

    /// Replace the decoder registry.
    pub fn with_decoders(mut self, decoders: Decoders) -> Self {
        self.decoders = decoders;
        self
    }

    /// Send [`PipelineEvent`]s to `sender` during every run.
    pub fn with_events(mut self, sender: mpsc::UnboundedSender<PipelineEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    /// Cancelling this token stops the run between tasks.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Find the files a run over `root` starts with.
    ///
    /// A directory is scanned; a single file is treated as an explicit,
    /// one-element list, so an unsupported file still reaches the pipeline
    /// and is counted as skipped.
    ///
    /// A root that is missing, or that exists but cannot be listed or opened,
    /// is fatal: it fails with [`ErrorKind::NotFound`] before any task exists.
    #[instrument(level = "debug", skip_all, fields(root = %root.display()))]
    pub fn discover(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let not_found = || ErrorKind::NotFound(root.to_path_buf());
        let metadata = fs::metadata(root).or_raise(not_found)?;
        let files = match metadata.is_dir() {
            true => {
                fs::read_dir(root).or_raise(not_found)?;
                self.scanner.scan(root).collect()
            },
            false => {
                File::open(root).or_raise(not_found)?;
                self.scanner.filter_files([root.to_path_buf()])
            },
        };
        tracing::info!(root = %root.display(), files = files.len(), "discovery complete");
        Ok(files)
    }

    /// Process `files` and everything nested inside them.
    pub async fn run(&self, files: Vec<PathBuf>) -> Result<RunReport> {
        let tasks: Vec<FileTask> = files.into_iter().map(FileTask::root).collect();
        let total = tasks.len() as u64;
        let observer = Observer::new(self.events.clone());
        let shared = Arc::new(Shared {
            queue: TaskQueue::new(tasks),
            progress: ProgressTracker::new(total),
            observer: observer.clone(),
            decoders: self.decoders.clone(),
            expander: self.expander.clone(),
            checksums: self.checksums,
        });
        tracing::info!(files = total, workers = self.workers, "starting extraction");
        observer.emit(PipelineEvent::Started { total });

        let (sender, receiver) = mpsc::unbounded_channel();
        let aggregator = tokio::spawn(Aggregator::collect(receiver));
        let workers: Vec<_> = (0..self.workers)
            .map(|id| tokio::spawn(worker::run(id, Arc::clone(&shared), sender.clone(), self.cancel.clone())))
            .collect();
        drop(sender);
        for handle in workers {
            handle.await.or_raise(|| ErrorKind::Join)?;
        }
        let results = aggregator.await.or_raise(|| ErrorKind::Join)?.into_results();

        let cancelled = self.cancel.is_cancelled();
        let dropped = shared.queue.len();
        let progress = shared.progress.snapshot();
        match cancelled {
            true => tracing::warn!(processed = progress.processed, dropped, "extraction cancelled"),
            false => tracing::info!(
                processed = progress.processed,
                succeeded = progress.succeeded,
                failed = progress.failed,
                skipped = progress.skipped,
                "extraction complete"
            ),
        }
        observer.emit(PipelineEvent::Finished { snapshot: progress.clone(), cancelled });
        // Drops any tasks left behind by cancellation, and with them their
        // archives' scratch directories.
        drop(shared);
        Ok(RunReport { results, progress, cancelled, dropped })
    }

    /// [`discover`](Self::discover) then [`run`](Self::run).
    pub async fn run_path(&self, root: &Path) -> Result<RunReport> {
        let files = self.discover(root)?;
        self.run(files).await
    }
}
