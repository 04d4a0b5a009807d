//! Spawning abstraction and the Tokio implementation.

use std::fmt;

use futures::future::BoxFuture;

/// Abstraction for spawning task execution on a runtime.
///
/// Object safe so a channel can hold any spawner behind an `Arc`.
///
/// Implementations must poll every spawned future to completion. A channel
/// spawns its work driver and its deferred dispatch rounds through this
/// trait; a dropped driver leaves the work handed to it unpolled, its slots
/// occupied and its handles resolved to `Cancelled`, and a dropped dispatch
/// round stalls the queue.
pub trait Spawn: Send + Sync {
    /// Spawn a detached future.
    fn spawn(&self, fut: BoxFuture<'static, ()>);
}

/// Tokio-based spawner.
///
/// Without an explicit handle it spawns onto the runtime current at the time
/// of each spawn.
#[derive(Clone, Default)]
pub struct TokioSpawner {
    handle: Option<tokio::runtime::Handle>,
}

impl TokioSpawner {
    /// Spawn onto a specific runtime handle.
    pub const fn new(handle: tokio::runtime::Handle) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    /// Spawn onto whatever runtime is current when work is dispatched.
    ///
    /// Dispatching then requires being inside a Tokio runtime, as
    /// `tokio::spawn` does.
    pub const fn ambient() -> Self {
        Self { handle: None }
    }

    /// Capture the current runtime handle, if called inside one.
    pub fn try_current() -> Option<Self> {
        tokio::runtime::Handle::try_current().ok().map(Self::new)
    }
}

impl Spawn for TokioSpawner {
    fn spawn(&self, fut: BoxFuture<'static, ()>) {
        match &self.handle {
            Some(handle) => {
                handle.spawn(fut);
            }
            None => {
                tokio::spawn(fut);
            }
        }
    }
}

impl fmt::Debug for TokioSpawner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioSpawner")
            .field("pinned_handle", &self.handle.is_some())
            .finish()
    }
}
