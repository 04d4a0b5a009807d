//! Deferred trigger: run a callback on a later scheduling tick.
//!
//! After a task settles the channel never dispatches inline on the settling
//! call stack; it hands the next dispatch round to the configured
//! [`Deferral`]. The strategy is chosen once, when the channel is built.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::runtime::spawn::Spawn;

/// Callback handed to a deferred trigger.
pub type DeferredCallback = Box<dyn FnOnce() + Send + 'static>;

/// Host-provided trigger, e.g. a render loop that drains callbacks once per
/// frame.
pub trait DeferredTrigger: Send + Sync {
    /// Arrange for `callback` to run on a later tick.
    fn defer(&self, callback: DeferredCallback);
}

/// How the next dispatch round is scheduled after a task settles.
#[derive(Clone, Default)]
pub enum Deferral {
    /// Spawn the callback as its own task on the channel's spawner.
    #[default]
    NextTick,
    /// Run the callback after a minimal timer delay.
    Timer(Duration),
    /// Call the callback inline. Only for harnesses without a runtime tick.
    Immediate,
    /// Delegate to a host trigger.
    Custom(Arc<dyn DeferredTrigger>),
}

impl Deferral {
    /// Schedule `callback` according to this strategy.
    pub(crate) fn schedule(&self, spawner: &dyn Spawn, callback: DeferredCallback) {
        match self {
            Self::NextTick => spawner.spawn(Box::pin(async move { callback() })),
            Self::Timer(delay) => {
                let delay = *delay;
                spawner.spawn(Box::pin(async move {
                    tokio::time::sleep(delay).await;
                    callback();
                }));
            }
            Self::Immediate => callback(),
            Self::Custom(trigger) => trigger.defer(callback),
        }
    }
}

impl fmt::Debug for Deferral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NextTick => write!(f, "NextTick"),
            Self::Timer(delay) => f.debug_tuple("Timer").field(delay).finish(),
            Self::Immediate => write!(f, "Immediate"),
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::spawn::TokioSpawner;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_immediate_runs_inline() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        Deferral::Immediate.schedule(
            &TokioSpawner::ambient(),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_next_tick_runs_later() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let ran_inline = Arc::new(AtomicUsize::new(0));
        let flag = Arc::clone(&ran_inline);
        Deferral::NextTick.schedule(
            &TokioSpawner::ambient(),
            Box::new(move || {
                flag.fetch_add(1, Ordering::SeqCst);
                let _ = tx.send(());
            }),
        );
        assert_eq!(ran_inline.load(Ordering::SeqCst), 0);
        rx.await.expect("deferred callback ran");
        assert_eq!(ran_inline.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_waits_for_delay() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let start = tokio::time::Instant::now();
        Deferral::Timer(Duration::from_millis(4)).schedule(
            &TokioSpawner::ambient(),
            Box::new(move || {
                let _ = tx.send(tokio::time::Instant::now());
            }),
        );
        let fired_at = rx.await.expect("timer fired");
        assert!(fired_at - start >= Duration::from_millis(4));
    }

    struct QueueTrigger {
        pending: Mutex<Vec<DeferredCallback>>,
    }

    impl DeferredTrigger for QueueTrigger {
        fn defer(&self, callback: DeferredCallback) {
            self.pending.lock().push(callback);
        }
    }

    #[test]
    fn test_custom_trigger_receives_callback() {
        let trigger = Arc::new(QueueTrigger {
            pending: Mutex::new(Vec::new()),
        });
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        Deferral::Custom(trigger.clone()).schedule(
            &TokioSpawner::ambient(),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        for callback in trigger.pending.lock().drain(..) {
            callback();
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
