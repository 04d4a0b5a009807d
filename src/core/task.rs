//! Task identity, metadata and per-submission options.

use std::cmp::Ordering;
use std::fmt;
use std::future::{ready, Ready};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::core::error::AppResult;
use crate::core::event::TaskObserver;
use crate::util::clock::now_ms;

/// Identifier of a task, unique within the channel that issued it.
///
/// Ids increase monotonically in submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Priority value. Lower runs first; negative values are allowed.
pub type Priority = i32;

/// Immutable description of a submitted task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInfo {
    /// Channel-scoped identifier.
    pub id: TaskId,
    /// Priority used for queue ordering.
    pub priority: Priority,
    /// Monotonic submission instant, used as the ordering tie-break.
    pub requested_at: Instant,
    /// Submission time in milliseconds since epoch, for logs and records.
    pub requested_at_ms: u128,
}

impl TaskInfo {
    /// Describe a task submitted now.
    pub fn new(id: TaskId, priority: Priority) -> Self {
        Self {
            id,
            priority,
            requested_at: Instant::now(),
            requested_at_ms: now_ms(),
        }
    }

    /// Run-queue ordering: priority ascending, then submission instant.
    ///
    /// Equal keys compare as `Equal`; the queue relies on a stable sort to
    /// keep insertion order among them.
    pub fn queue_order(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.requested_at.cmp(&other.requested_at))
    }
}

/// Per-submission options: priority and an optional task-scoped observer.
pub struct TaskOptions<T> {
    pub(crate) priority: Priority,
    pub(crate) observer: Option<Arc<dyn TaskObserver<T>>>,
}

impl<T> TaskOptions<T> {
    /// Options with priority 0 and no observer.
    pub const fn new() -> Self {
        Self {
            priority: 0,
            observer: None,
        }
    }

    /// Set the priority (lower runs first).
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Attach a shared task observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn TaskObserver<T>>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Attach a closure as the task observer.
    #[must_use]
    pub fn on_event<F>(self, f: F) -> Self
    where
        T: 'static,
        F: Fn(&crate::core::Channel, &TaskInfo, &crate::core::TaskEvent<'_, T>)
            + Send
            + Sync
            + 'static,
    {
        self.with_observer(Arc::new(f))
    }

    /// Configured priority.
    pub const fn priority(&self) -> Priority {
        self.priority
    }
}

impl<T> Default for TaskOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for TaskOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskOptions")
            .field("priority", &self.priority)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

/// Adapt synchronous work into the closure shape the channel accepts.
///
/// The closure still runs on the channel's work driver, once a slot is free.
///
/// ```rust,ignore
/// let handle = channel.submit(sync_work(|| Ok(2 + 2)));
/// ```
pub fn sync_work<T, F>(f: F) -> impl FnOnce() -> Ready<AppResult<T>> + Send + 'static
where
    T: Send + 'static,
    F: FnOnce() -> AppResult<T> + Send + 'static,
{
    move || ready(f())
}
