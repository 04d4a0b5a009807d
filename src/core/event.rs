//! Lifecycle events and the observer traits that receive them.
//!
//! Two namespaces exist. The channel observer sees every [`ChannelEvent`]
//! including [`ChannelEvent::CancelledAllTasks`]; a task observer sees the
//! task-scoped subset as typed [`TaskEvent`]s for its own task only. For a
//! single task the channel observer is always notified first.
//!
//! Per task the sequence is `TASK_ADDED` followed by either
//! `TASK_CANCELLED`, or `TASK_STARTED` then `TASK_COMPLETED`.

use std::any::Any;

use serde::{Deserialize, Serialize};

use crate::core::channel::Channel;
use crate::core::task::TaskInfo;

/// Flat event tag, shared by both namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// Task entered the run queue.
    TaskAdded,
    /// Task moved into the in-flight set and its work was started.
    TaskStarted,
    /// Task work settled, successfully or not.
    TaskCompleted,
    /// Task was removed from the run queue before starting.
    TaskCancelled,
    /// The whole run queue was cancelled at once.
    CancelledAllTasks,
}

impl EventKind {
    /// True for the events that end a task's lifecycle.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::TaskCompleted | Self::TaskCancelled)
    }
}

/// Event delivered to the channel-wide observer.
#[derive(Debug)]
pub enum ChannelEvent<'a> {
    /// See [`EventKind::TaskAdded`].
    TaskAdded(&'a TaskInfo),
    /// See [`EventKind::TaskStarted`].
    TaskStarted(&'a TaskInfo),
    /// See [`EventKind::TaskCompleted`]. The success value is type-erased
    /// because one channel runs tasks of many result types.
    TaskCompleted {
        /// Settled task.
        task: &'a TaskInfo,
        /// Borrowed view of the value or error about to reach the submitter.
        result: Result<&'a (dyn Any + Send), &'a anyhow::Error>,
    },
    /// See [`EventKind::TaskCancelled`].
    TaskCancelled(&'a TaskInfo),
    /// Emitted once per `cancel_all` sweep, before the per-task
    /// `TaskCancelled` events.
    CancelledAllTasks {
        /// Number of queued tasks that are about to be cancelled.
        count: usize,
    },
}

impl ChannelEvent<'_> {
    /// Flat tag of this event.
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::TaskAdded(_) => EventKind::TaskAdded,
            Self::TaskStarted(_) => EventKind::TaskStarted,
            Self::TaskCompleted { .. } => EventKind::TaskCompleted,
            Self::TaskCancelled(_) => EventKind::TaskCancelled,
            Self::CancelledAllTasks { .. } => EventKind::CancelledAllTasks,
        }
    }

    /// Task this event concerns, if it is task-scoped.
    pub const fn task(&self) -> Option<&TaskInfo> {
        match self {
            Self::TaskAdded(task)
            | Self::TaskStarted(task)
            | Self::TaskCancelled(task)
            | Self::TaskCompleted { task, .. } => Some(task),
            Self::CancelledAllTasks { .. } => None,
        }
    }

    /// `Some(is_success)` for completion events.
    pub const fn is_success(&self) -> Option<bool> {
        match self {
            Self::TaskCompleted { result, .. } => Some(result.is_ok()),
            _ => None,
        }
    }
}

/// Event delivered to a task's own observer, typed by the task's result.
#[derive(Debug)]
pub enum TaskEvent<'a, T> {
    /// See [`EventKind::TaskAdded`].
    Added,
    /// See [`EventKind::TaskStarted`].
    Started,
    /// See [`EventKind::TaskCompleted`].
    Completed(Result<&'a T, &'a anyhow::Error>),
    /// See [`EventKind::TaskCancelled`].
    Cancelled,
}

impl<T> TaskEvent<'_, T> {
    /// Flat tag of this event.
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Added => EventKind::TaskAdded,
            Self::Started => EventKind::TaskStarted,
            Self::Completed(_) => EventKind::TaskCompleted,
            Self::Cancelled => EventKind::TaskCancelled,
        }
    }
}

/// Receives every event of a channel.
///
/// Observers run synchronously on the thread that triggered the event and may
/// call back into the channel (for example to cancel queued work).
pub trait ChannelObserver: Send + Sync {
    /// Handle one event.
    fn on_event(&self, channel: &Channel, event: &ChannelEvent<'_>);
}

impl<F> ChannelObserver for F
where
    F: Fn(&Channel, &ChannelEvent<'_>) + Send + Sync,
{
    fn on_event(&self, channel: &Channel, event: &ChannelEvent<'_>) {
        self(channel, event);
    }
}

/// Receives the events of one task.
pub trait TaskObserver<T>: Send + Sync {
    /// Handle one event for `task`.
    fn on_task_event(&self, channel: &Channel, task: &TaskInfo, event: &TaskEvent<'_, T>);
}

impl<T, F> TaskObserver<T> for F
where
    F: Fn(&Channel, &TaskInfo, &TaskEvent<'_, T>) + Send + Sync,
{
    fn on_task_event(&self, channel: &Channel, task: &TaskInfo, event: &TaskEvent<'_, T>) {
        self(channel, task, event);
    }
}
