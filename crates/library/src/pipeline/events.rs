use crate::progress::ProgressSnapshot;
use tokio::sync::mpsc::UnboundedSender;

/// What a run reports to an observer while it works.
///
/// Events follow a loose ordering:
/// 1. [`Started`](Self::Started) exactly once, with the initial task count.
/// 2. Per task, either [`Skipped`](Self::Skipped) or (only when the task
///    produced an `error` result) [`Failed`](Self::Failed), then one
///    [`Progress`](Self::Progress). Workers interleave freely.
/// 3. [`Finished`](Self::Finished) exactly once, with the final counters.
#[derive(Clone, Debug)]
pub enum PipelineEvent {
    Started { total: u64 },
    /// A file with no capability; it produces no result.
    Skipped { path: String },
    /// A file whose result has status `error`.
    Failed { path: String, message: String },
    Progress(ProgressSnapshot),
    Finished { snapshot: ProgressSnapshot, cancelled: bool },
}

/// Optional, lossy event sink. A receiver that went away is ignored.
#[derive(Clone, Debug, Default)]
pub(crate) struct Observer(Option<UnboundedSender<PipelineEvent>>);

impl Observer {
    pub(crate) fn new(sender: Option<UnboundedSender<PipelineEvent>>) -> Self {
        Self(sender)
    }

    pub(crate) fn emit(&self, event: PipelineEvent) {
        if let Some(sender) = &self.0 {
            let _ = sender.send(event);
        }
    }
}
