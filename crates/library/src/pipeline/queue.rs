use crate::task::FileTask;
use std::collections::VecDeque;
use std::pin::pin;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
struct State {
    tasks: VecDeque<FileTask>,
    in_flight: usize,
}

/// The run's shared, growable work queue.
///
/// A run is over once the queue is empty and no worker holds an
/// [`InFlight`] guard, because only an in-flight task can add more work.
#[derive(Debug, Default)]
pub(crate) struct TaskQueue {
    state: Mutex<State>,
    notify: Notify,
}

/// Marks a dequeued task as being worked on until dropped.
#[must_use]
pub(crate) struct InFlight<'a> {
    queue: &'a TaskQueue,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let idle = {
            let mut state = self.queue.lock();
            state.in_flight -= 1;
            state.in_flight == 0 && state.tasks.is_empty()
        };
        if idle {
            self.queue.notify.notify_waiters();
        }
    }
}

impl TaskQueue {
    pub(crate) fn new(tasks: impl IntoIterator<Item = FileTask>) -> Self {
        Self { state: Mutex::new(State { tasks: tasks.into_iter().collect(), in_flight: 0 }), notify: Notify::new() }
    }

    pub(crate) fn push(&self, task: FileTask) {
        self.lock().tasks.push_back(task);
        self.notify.notify_one();
    }

    /// Tasks still waiting. After a cancelled run these are the dropped ones.
    pub(crate) fn len(&self) -> usize {
        self.lock().tasks.len()
    }

    /// Wait for the next task.
    ///
    /// Returns `None` once the run is finished or `cancel` has fired; a
    /// cancelled queue hands out nothing more, even if tasks remain.
    pub(crate) async fn next(&self, cancel: &CancellationToken) -> Option<(FileTask, InFlight<'_>)> {
        loop {
            // Registered before the state is inspected, so a push or the
            // last task finishing in between still wakes this worker.
            let mut notified = pin!(self.notify.notified());
            notified.as_mut().enable();
            {
                let mut state = self.lock();
                if cancel.is_cancelled() {
                    return None;
                }
                if let Some(task) = state.tasks.pop_front() {
                    state.in_flight += 1;
                    return Some((task, InFlight { queue: self }));
                }
                if state.in_flight == 0 {
                    drop(state);
                    self.notify.notify_waiters();
                    return None;
                }
            }
            tokio::select! {
                () = notified => {},
                () = cancel.cancelled() => return None,
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // Queue operations never panic midway; a poisoned lock is still consistent.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
