//! Core scheduling abstractions: the channel, its run queue, tasks, outcomes
//! and lifecycle events.

pub mod audit;
pub mod channel;
pub mod error;
pub mod event;
pub mod outcome;
pub(crate) mod run_queue;
pub mod signal;
pub mod task;

pub use audit::{EventLog, EventRecord};
pub use channel::{Channel, ChannelId, ChannelStats};
pub use error::{AppResult, ChannelError};
pub use event::{ChannelEvent, ChannelObserver, EventKind, TaskEvent, TaskObserver};
pub use outcome::{Outcome, OutcomeKind};
pub use signal::TaskHandle;
pub use task::{sync_work, Priority, TaskId, TaskInfo, TaskOptions};
