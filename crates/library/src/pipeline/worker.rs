use crate::dispatch;
use crate::expand::ArchiveExpander;
use crate::pipeline::events::{Observer, PipelineEvent};
use crate::pipeline::queue::TaskQueue;
use crate::progress::{Outcome, ProgressTracker};
use crate::task::{FileTask, TaskSubmitter};
use std::any::Any;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use trawl_extract::models::{Capability, ExtractionResult, FileMetadata, Status};
use trawl_extract::{Decoders, extract_file};

/// State every worker of one run shares.
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) queue: TaskQueue,
    pub(crate) progress: ProgressTracker,
    pub(crate) observer: Observer,
    pub(crate) decoders: Decoders,
    pub(crate) expander: ArchiveExpander,
    pub(crate) checksums: bool,
}

impl TaskSubmitter for Shared {
    fn submit(&self, task: FileTask) {
        tracing::debug!(path = %task.display(), depth = task.depth, "queueing archive member");
        self.progress.add_total(1);
        self.queue.push(task);
    }
}

enum Handled {
    Skipped,
    Done(ExtractionResult),
}

pub(crate) async fn run(id: usize, shared: Arc<Shared>, results: UnboundedSender<ExtractionResult>, cancel: CancellationToken) {
    tracing::trace!(worker = id, "worker started");
    while let Some((task, _in_flight)) = shared.queue.next(&cancel).await {
        let path = task.display();
        let name = task.file_name();
        tracing::debug!(worker = id, path = %path, depth = task.depth, "processing");

        let snapshot = match handle(&shared, task).await {
            Handled::Skipped => {
                shared.observer.emit(PipelineEvent::Skipped { path });
                shared.progress.update(Outcome::Skipped, name)
            },
            Handled::Done(result) => {
                let outcome = Outcome::from(result.extraction_status);
                if result.extraction_status == Status::Error {
                    let message = result.error_message.clone().unwrap_or_default();
                    shared.observer.emit(PipelineEvent::Failed { path, message });
                }
                // The aggregator outlives every worker.
                let _ = results.send(result);
                shared.progress.update(outcome, name)
            },
        };
        shared.observer.emit(PipelineEvent::Progress(snapshot));
    }
    tracing::trace!(worker = id, "worker finished");
}

async fn handle(shared: &Arc<Shared>, task: FileTask) -> Handled {
    let capability = dispatch::resolve(&task.path);
    let provenance = task.scope.as_ref().map(|scope| (task.depth, scope.provenance().display().to_string()));
    let (path, display_path) = (task.path.clone(), task.display_path.clone());

    let outcome = match capability {
        Capability::Unknown => {
            tracing::info!(path = %task.display(), "skipping file with unsupported type");
            return Handled::Skipped;
        },
        Capability::Container => {
            let shared = Arc::clone(shared);
            tokio::task::spawn_blocking(move || shared.expander.expand(&task, shared.as_ref())).await
        },
        capability => match shared.decoders.get(capability) {
            Some(decoder) => {
                let checksums = shared.checksums;
                tokio::task::spawn_blocking(move || {
                    extract_file(&task.path, task.display_path.as_deref(), decoder.as_ref(), checksums)
                })
                .await
            },
            None => Ok(ExtractionResult::failure(
                FileMetadata::unreadable(&path, display_path.as_deref()),
                format!("no decoder registered for {capability} files"),
            )),
        },
    };

    let result = outcome.unwrap_or_else(|err| {
        let message = panic_message(err);
        tracing::error!(path = %path.display(), error = %message, "extraction aborted");
        ExtractionResult::failure(FileMetadata::unreadable(&path, display_path.as_deref()), message)
    });
    Handled::Done(match provenance {
        Some((depth, source)) => result.with_provenance(depth, source),
        None => result,
    })
}

fn panic_message(err: JoinError) -> String {
    if err.is_cancelled() {
        return "extraction was cancelled".to_string();
    }
    let payload: Box<dyn Any + Send> = err.into_panic();
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("extraction panicked: {detail}")
}
