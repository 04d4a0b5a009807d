//! Completion signal: a resolve-once sender paired with an awaitable handle.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::core::outcome::Outcome;
use crate::core::task::{TaskId, TaskInfo};

/// Create a linked signal/handle pair for `info`.
pub(crate) fn completion_signal<T>(info: TaskInfo) -> (CompletionSignal<T>, TaskHandle<T>) {
    let (tx, rx) = oneshot::channel();
    (CompletionSignal { tx }, TaskHandle { info, rx })
}

/// Scheduler-side half. Consumed on resolve, so it resolves at most once.
pub(crate) struct CompletionSignal<T> {
    tx: oneshot::Sender<Outcome<T>>,
}

impl<T> CompletionSignal<T> {
    /// Deliver the outcome. A dropped handle is not an error.
    pub(crate) fn resolve(self, outcome: Outcome<T>) {
        let _ = self.tx.send(outcome);
    }
}

/// Awaitable handle returned by every submission.
///
/// Resolves exactly once. If the channel drops the task without settling it
/// (the channel itself was discarded while the task was queued), the handle
/// resolves to [`Outcome::Cancelled`].
#[derive(Debug)]
pub struct TaskHandle<T> {
    info: TaskInfo,
    rx: oneshot::Receiver<Outcome<T>>,
}

impl<T> TaskHandle<T> {
    /// Identifier of the submitted task, accepted by `Channel::cancel_one`.
    pub const fn id(&self) -> TaskId {
        self.info.id
    }

    /// Metadata of the submitted task.
    pub const fn info(&self) -> &TaskInfo {
        &self.info
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = Outcome<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Outcome::Cancelled))
    }
}
