//! Bounded in-memory event log.
//!
//! `EventLog` is a ready-made [`ChannelObserver`] that keeps the most recent
//! events as plain records, for tests, debugging endpoints and tooling.

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::channel::Channel;
use crate::core::event::{ChannelEvent, ChannelObserver, EventKind};
use crate::core::task::{Priority, TaskId};
use crate::util::clock::now_ms;

/// One recorded event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Name of the channel that emitted the event.
    pub channel: String,
    /// Event tag.
    pub kind: EventKind,
    /// Task the event concerns, absent for `CANCELLED_ALL_TASKS`.
    pub task_id: Option<TaskId>,
    /// Task priority, when task-scoped.
    pub priority: Option<Priority>,
    /// Set on `TASK_COMPLETED` only.
    pub is_success: Option<bool>,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
}

impl EventRecord {
    /// Build a record from a live event.
    pub fn from_event(channel: &Channel, event: &ChannelEvent<'_>) -> Self {
        let task = event.task();
        Self {
            channel: channel.name().to_string(),
            kind: event.kind(),
            task_id: task.map(|t| t.id),
            priority: task.map(|t| t.priority),
            is_success: event.is_success(),
            created_at_ms: now_ms(),
        }
    }
}

/// Bounded event log; the oldest record is dropped once full.
pub struct EventLog {
    events: Mutex<VecDeque<EventRecord>>,
    max_events: usize,
}

impl EventLog {
    /// Create a log that keeps at most `max_events` records.
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(max_events.min(1024))),
            max_events,
        }
    }

    /// Append a record, evicting the oldest if the log is full.
    pub fn record(&self, record: EventRecord) {
        if self.max_events == 0 {
            return;
        }
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(record);
    }

    /// Snapshot of stored records, oldest first.
    pub fn events(&self) -> Vec<EventRecord> {
        self.events.lock().iter().cloned().collect()
    }

    /// Event kinds recorded for one task, oldest first.
    pub fn kinds_for(&self, task_id: TaskId) -> Vec<EventKind> {
        self.events
            .lock()
            .iter()
            .filter(|r| r.task_id == Some(task_id))
            .map(|r| r.kind)
            .collect()
    }

    /// All recorded kinds, oldest first.
    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().iter().map(|r| r.kind).collect()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Drop every stored record.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl ChannelObserver for EventLog {
    fn on_event(&self, channel: &Channel, event: &ChannelEvent<'_>) {
        self.record(EventRecord::from_event(channel, event));
    }
}
