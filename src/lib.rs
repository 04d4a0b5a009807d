//! # Prometheus Channel
//!
//! A bounded-concurrency, priority-ordered task channel.
//!
//! A [`Channel`] accepts synchronous or asynchronous work, orders it by
//! priority (lower first) then arrival, runs at most N items at once, and
//! reports every lifecycle transition to observers.
//!
//! ## Key Features
//!
//! - **Priority run queue**: stable ordering by (priority, arrival)
//! - **Admission control**: never more than `concurrency_limit` tasks in flight
//! - **Three admission policies**: normal, exclusive (displaces queued work),
//!   and idle-only (turned away when anything is queued)
//! - **Cancellation**: of one queued task or the whole queue; in-flight work
//!   always runs to completion
//! - **Observable**: channel-wide and per-task observers see
//!   `TASK_ADDED`, `TASK_STARTED`, `TASK_COMPLETED`, `TASK_CANCELLED` and
//!   `CANCELLED_ALL_TASKS`
//! - **Typed outcomes**: every handle resolves to exactly one
//!   [`Outcome`]: `Success`, `Failure` or `Cancelled`
//! - **Injected deferral**: the next dispatch round after a settle runs on a
//!   later tick chosen by [`Deferral`], never on the settling call stack
//!
//! ## Example
//!
//! ```rust,ignore
//! use prometheus_channel::{sync_work, Channel, Outcome, TaskOptions};
//!
//! let channel = Channel::new(1);
//!
//! let first = channel.submit(|| async {
//!     tokio::time::sleep(std::time::Duration::from_millis(10)).await;
//!     Ok("slow")
//! });
//! let urgent = channel.submit_with(TaskOptions::new().with_priority(-1), sync_work(|| Ok("urgent")));
//!
//! assert!(matches!(first.await, Outcome::Success("slow")));
//! assert!(matches!(urgent.await, Outcome::Success("urgent")));
//! ```
//!
//! For complete examples, see `tests/channel_test.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions: channel, run queue, tasks, events.
pub mod core;
/// Configuration models for channels.
pub mod config;
/// Builders to construct channels from code or configuration.
pub mod builders;
/// Runtime adapters: spawning, the work driver and deferred scheduling.
pub mod runtime;
/// Shared utilities.
pub mod util;

pub use crate::builders::ChannelBuilder;
pub use crate::config::{ChannelConfig, DeferralConfig};
pub use crate::core::{
    sync_work, AppResult, Channel, ChannelError, ChannelEvent, ChannelObserver, ChannelStats,
    EventKind, EventLog, Outcome, TaskEvent, TaskHandle, TaskId, TaskInfo, TaskObserver,
    TaskOptions,
};
pub use crate::runtime::{Deferral, DeferredTrigger, Spawn, TokioSpawner};
