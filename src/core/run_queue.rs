//! Priority-ordered run queue of tasks that have not started yet.

use std::collections::VecDeque;

use crate::core::task::{TaskId, TaskInfo};

/// A queued task: its metadata plus whatever the channel needs to run it.
pub(crate) struct Entry<J> {
    pub(crate) info: TaskInfo,
    pub(crate) job: J,
}

/// Run queue sorted by (priority asc, requested-at asc).
///
/// Every push re-sorts with a stable sort, so tasks with equal keys keep
/// their insertion order.
pub(crate) struct RunQueue<J> {
    entries: VecDeque<Entry<J>>,
}

impl<J> RunQueue<J> {
    pub(crate) const fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    /// Append and re-sort.
    pub(crate) fn push(&mut self, info: TaskInfo, job: J) {
        self.entries.push_back(Entry { info, job });
        self.entries
            .make_contiguous()
            .sort_by(|a, b| a.info.queue_order(&b.info));
    }

    /// Take the head: lowest priority value, earliest arrival.
    pub(crate) fn pop_front(&mut self) -> Option<Entry<J>> {
        self.entries.pop_front()
    }

    /// Swap the queue for an empty one and return the former contents in
    /// queue order.
    pub(crate) fn take_all(&mut self) -> Vec<Entry<J>> {
        std::mem::take(&mut self.entries).into_iter().collect()
    }

    /// Remove the entry for `id`, if it is still queued.
    pub(crate) fn remove(&mut self, id: TaskId) -> Option<Entry<J>> {
        let index = self.entries.iter().position(|e| e.info.id == id)?;
        self.entries.remove(index)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Metadata of every queued task, head first.
    pub(crate) fn snapshot(&self) -> Vec<TaskInfo> {
        self.entries.iter().map(|e| e.info.clone()).collect()
    }
}
