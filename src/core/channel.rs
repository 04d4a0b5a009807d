//! The channel: a priority run queue coupled to a bounded-concurrency
//! dispatch loop.
//!
//! # Model
//!
//! - Submissions are appended to the run queue, which is kept sorted by
//!   (priority asc, arrival asc) with a stable sort.
//! - At most `concurrency_limit` tasks are in flight. Each dispatch round
//!   moves queue heads into the in-flight set while slots are free and hands
//!   their work to the channel's driver, a single task started on the
//!   channel's [`Spawn`] implementation that polls all in-flight work. Bodies
//!   therefore start in dispatch order on any runtime flavor.
//! - When work settles, its slot is freed, `TASK_COMPLETED` is emitted, the
//!   submitter's handle resolves, and the next round is scheduled through the
//!   configured [`Deferral`] rather than called on the settling stack.
//! - Cancellation only ever touches queued tasks. In-flight work always
//!   settles as success or failure.
//!
//! # Locking
//!
//! Queue and in-flight state live behind one `parking_lot::ReentrantMutex`.
//! Holding it serializes every mutate-then-notify sequence, and because it is
//! re-entrant an observer may call back into the channel from inside an
//! event. `RefCell` borrows are never held while observers run, and the lock
//! is never held across an `.await`. A panicking observer is logged and
//! skipped so the bookkeeping around it always completes.

use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::{Mutex, ReentrantMutex};
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use uuid::Uuid;

use crate::builders::ChannelBuilder;
use crate::core::error::{AppResult, ChannelError};
use crate::core::event::{ChannelEvent, ChannelObserver, EventKind, TaskEvent, TaskObserver};
use crate::core::outcome::Outcome;
use crate::core::run_queue::{Entry, RunQueue};
use crate::core::signal::{completion_signal, CompletionSignal, TaskHandle};
use crate::core::task::{TaskId, TaskInfo, TaskOptions};
use crate::runtime::driver::Driver;
use crate::runtime::{Deferral, Spawn};

/// Unique identity of a channel instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub Uuid);

impl ChannelId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ChannelId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Point-in-time view of channel utilization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelStats {
    /// Maximum simultaneously in-flight tasks.
    pub concurrency_limit: usize,
    /// Tasks waiting in the run queue.
    pub queued_tasks: usize,
    /// Tasks currently executing.
    pub in_flight_tasks: usize,
    /// Tasks accepted into the run queue.
    pub submitted_tasks: u64,
    /// Idle-only submissions turned away because work was queued.
    pub rejected_tasks: u64,
    /// Tasks moved into the in-flight set.
    pub started_tasks: u64,
    /// Tasks that settled successfully.
    pub completed_tasks: u64,
    /// Tasks whose work returned an error or panicked.
    pub failed_tasks: u64,
    /// Queued tasks that were cancelled.
    pub cancelled_tasks: u64,
}

#[derive(Debug, Default)]
struct ChannelCounters {
    submitted: AtomicU64,
    rejected: AtomicU64,
    started: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
}

/// Admission policy of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    Normal,
    Exclusive,
    IfIdle,
}

/// Type-erased queued work. The typed pieces (work closure, task observer,
/// completion signal) stay inside the implementation.
trait PendingJob: Send {
    /// Notify the task observer that the task started.
    fn started(&self, channel: &Channel, task: &TaskInfo);
    /// Build the future that runs the work and settles the task.
    fn run(self: Box<Self>, channel: Channel, task: TaskInfo) -> BoxFuture<'static, ()>;
    /// Notify the task observer and resolve the handle as cancelled.
    fn cancelled(self: Box<Self>, channel: &Channel, task: &TaskInfo);
}

struct Job<T, F> {
    work: F,
    observer: Option<Arc<dyn TaskObserver<T>>>,
    signal: CompletionSignal<T>,
}

impl<T, F, Fut> PendingJob for Job<T, F>
where
    T: Send + 'static,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = AppResult<T>> + Send + 'static,
{
    fn started(&self, channel: &Channel, task: &TaskInfo) {
        if let Some(observer) = &self.observer {
            channel.guard_observer(EventKind::TaskStarted, || {
                observer.on_task_event(channel, task, &TaskEvent::Started);
            });
        }
    }

    fn run(self: Box<Self>, channel: Channel, task: TaskInfo) -> BoxFuture<'static, ()> {
        let Self {
            work,
            observer,
            signal,
        } = *self;
        Box::pin(async move {
            // `work()` is called inside the guarded future so a panic while
            // building the future is caught the same way as one while polling.
            let result = match AssertUnwindSafe(async move { work().await })
                .catch_unwind()
                .await
            {
                Ok(result) => result,
                Err(panic) => Err(ChannelError::TaskPanicked(panic_message(panic.as_ref())).into()),
            };
            channel.settle(&task, result, observer.as_deref(), signal);
        })
    }

    fn cancelled(self: Box<Self>, channel: &Channel, task: &TaskInfo) {
        if let Some(observer) = &self.observer {
            channel.guard_observer(EventKind::TaskCancelled, || {
                observer.on_task_event(channel, task, &TaskEvent::Cancelled);
            });
        }
        self.signal.resolve(Outcome::Cancelled);
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

struct ChannelState {
    concurrency_limit: usize,
    run_queue: RunQueue<Box<dyn PendingJob>>,
    in_flight: BTreeMap<TaskId, TaskInfo>,
}

struct ChannelInner {
    id: ChannelId,
    name: String,
    state: ReentrantMutex<RefCell<ChannelState>>,
    observer: Option<Arc<dyn ChannelObserver>>,
    spawner: Arc<dyn Spawn>,
    driver: Mutex<Driver>,
    deferral: Deferral,
    next_task_id: AtomicU64,
    counters: ChannelCounters,
    idle: Notify,
}

/// Bounded-concurrency, priority-ordered task channel.
///
/// Cheap to clone; clones share the same queue and in-flight set. Channels are
/// independent of each other; create as many as needed.
///
/// ```rust,ignore
/// use prometheus_channel::{Channel, Outcome};
///
/// let channel = Channel::new(2);
/// let handle = channel.submit(|| async { Ok(21 * 2) });
/// assert!(matches!(handle.await, Outcome::Success(42)));
/// ```
#[derive(Clone)]
pub struct Channel {
    inner: Arc<ChannelInner>,
}

impl Channel {
    /// Create a channel running at most `concurrency_limit` tasks at once,
    /// spawning on the ambient Tokio runtime with [`Deferral::NextTick`].
    ///
    /// A limit of 0 is raised to 1. Use [`Channel::builder`] for strict
    /// validation and the remaining options.
    pub fn new(concurrency_limit: usize) -> Self {
        if concurrency_limit == 0 {
            tracing::warn!("concurrency limit 0 raised to 1");
        }
        ChannelBuilder::new()
            .concurrency_limit(concurrency_limit.max(1))
            .build_unchecked()
    }

    /// Start configuring a channel.
    pub fn builder() -> ChannelBuilder {
        ChannelBuilder::new()
    }

    pub(crate) fn from_parts(
        name: String,
        concurrency_limit: usize,
        observer: Option<Arc<dyn ChannelObserver>>,
        spawner: Arc<dyn Spawn>,
        deferral: Deferral,
    ) -> Self {
        let id = ChannelId::new();
        tracing::debug!(channel = %name, %id, concurrency_limit, ?deferral, "channel created");
        Self {
            inner: Arc::new(ChannelInner {
                id,
                name,
                state: ReentrantMutex::new(RefCell::new(ChannelState {
                    concurrency_limit,
                    run_queue: RunQueue::new(),
                    in_flight: BTreeMap::new(),
                })),
                observer,
                spawner,
                driver: Mutex::new(Driver::new()),
                deferral,
                next_task_id: AtomicU64::new(1),
                counters: ChannelCounters::default(),
                idle: Notify::new(),
            }),
        }
    }

    /// Instance identity.
    pub fn id(&self) -> ChannelId {
        self.inner.id
    }

    /// Configured name, used in log fields and event records.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    // ------------------------------------------------------------------
    // Submission
    // ------------------------------------------------------------------

    /// Submit work with priority 0.
    ///
    /// The returned handle resolves to the task's [`Outcome`]. Work errors
    /// never escape here; they arrive as [`Outcome::Failure`].
    pub fn submit<T, F, Fut>(&self, work: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = AppResult<T>> + Send + 'static,
    {
        self.submit_with(TaskOptions::new(), work)
    }

    /// Submit work with explicit options.
    pub fn submit_with<T, F, Fut>(&self, options: TaskOptions<T>, work: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = AppResult<T>> + Send + 'static,
    {
        self.admit(Admission::Normal, options, work)
    }

    /// Cancel every queued task, then submit. In-flight tasks are untouched,
    /// so at most one task waits behind the in-flight set.
    pub fn submit_exclusive<T, F, Fut>(&self, work: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = AppResult<T>> + Send + 'static,
    {
        self.submit_exclusive_with(TaskOptions::new(), work)
    }

    /// [`Channel::submit_exclusive`] with explicit options.
    pub fn submit_exclusive_with<T, F, Fut>(&self, options: TaskOptions<T>, work: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = AppResult<T>> + Send + 'static,
    {
        self.admit(Admission::Exclusive, options, work)
    }

    /// Submit only if nothing is queued. Otherwise the handle resolves to
    /// [`Outcome::Cancelled`] immediately and no event is emitted.
    pub fn submit_if_idle<T, F, Fut>(&self, work: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = AppResult<T>> + Send + 'static,
    {
        self.submit_if_idle_with(TaskOptions::new(), work)
    }

    /// [`Channel::submit_if_idle`] with explicit options.
    pub fn submit_if_idle_with<T, F, Fut>(&self, options: TaskOptions<T>, work: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = AppResult<T>> + Send + 'static,
    {
        self.admit(Admission::IfIdle, options, work)
    }

    fn admit<T, F, Fut>(&self, admission: Admission, options: TaskOptions<T>, work: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = AppResult<T>> + Send + 'static,
    {
        let id = TaskId(self.inner.next_task_id.fetch_add(1, Ordering::Relaxed));
        let info = TaskInfo::new(id, options.priority);
        let (signal, handle) = completion_signal(info.clone());

        // Held across the policy check and the enqueue so both see one state.
        let _guard = self.inner.state.lock();

        match admission {
            Admission::IfIdle if self.queued_len() > 0 => {
                self.inner.counters.rejected.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(channel = %self.inner.name, task_id = id.0, "idle-only submission turned away");
                signal.resolve(Outcome::Cancelled);
                return handle;
            }
            Admission::Exclusive => {
                self.cancel_all();
            }
            _ => {}
        }

        let TaskOptions { observer, .. } = options;
        let job = Job {
            work,
            observer: observer.clone(),
            signal,
        };
        self.enqueue(info, Box::new(job), observer.as_deref());
        self.attempt_dispatch();
        handle
    }

    fn enqueue<T>(&self, info: TaskInfo, job: Box<dyn PendingJob>, observer: Option<&dyn TaskObserver<T>>) {
        let guard = self.inner.state.lock();
        let depth = {
            let mut state = guard.borrow_mut();
            state.run_queue.push(info.clone(), job);
            state.run_queue.len()
        };
        self.inner.counters.submitted.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            channel = %self.inner.name,
            task_id = info.id.0,
            priority = info.priority,
            depth,
            "task enqueued"
        );

        self.emit(&ChannelEvent::TaskAdded(&info));
        if let Some(observer) = observer {
            self.guard_observer(EventKind::TaskAdded, || {
                observer.on_task_event(self, &info, &TaskEvent::Added);
            });
        }
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Move queue heads into the in-flight set while slots are free.
    fn attempt_dispatch(&self) {
        let guard = self.inner.state.lock();
        loop {
            let entry: Entry<Box<dyn PendingJob>> = {
                let mut state = guard.borrow_mut();
                if state.in_flight.len() >= state.concurrency_limit {
                    tracing::trace!(channel = %self.inner.name, "at capacity");
                    return;
                }
                let Some(entry) = state.run_queue.pop_front() else {
                    return;
                };
                state.in_flight.insert(entry.info.id, entry.info.clone());
                entry
            };

            self.inner.counters.started.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                channel = %self.inner.name,
                task_id = entry.info.id.0,
                priority = entry.info.priority,
                "task started"
            );

            let Entry { info, job } = entry;
            self.emit(&ChannelEvent::TaskStarted(&info));
            job.started(self, &info);
            let task_id = info.id;
            let work = job.run(self.clone(), info);
            if !self.inner.driver.lock().hand_over(self.inner.spawner.as_ref(), work) {
                tracing::warn!(channel = %self.inner.name, task_id = task_id.0, "work driver unavailable; task dropped");
            }
        }
    }

    /// Record a settled task and schedule the next dispatch round.
    fn settle<T>(
        &self,
        task: &TaskInfo,
        result: AppResult<T>,
        observer: Option<&dyn TaskObserver<T>>,
        signal: CompletionSignal<T>,
    ) where
        T: Send + 'static,
    {
        {
            let guard = self.inner.state.lock();
            guard.borrow_mut().in_flight.remove(&task.id);

            match &result {
                Ok(value) => {
                    self.inner.counters.completed.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(channel = %self.inner.name, task_id = task.id.0, "task completed");
                    let erased: &(dyn Any + Send) = value;
                    self.emit(&ChannelEvent::TaskCompleted {
                        task,
                        result: Ok(erased),
                    });
                    if let Some(observer) = observer {
                        self.guard_observer(EventKind::TaskCompleted, || {
                            observer.on_task_event(self, task, &TaskEvent::Completed(Ok(value)));
                        });
                    }
                }
                Err(err) => {
                    self.inner.counters.failed.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(channel = %self.inner.name, task_id = task.id.0, error = %err, "task failed");
                    self.emit(&ChannelEvent::TaskCompleted {
                        task,
                        result: Err(err),
                    });
                    if let Some(observer) = observer {
                        self.guard_observer(EventKind::TaskCompleted, || {
                            observer.on_task_event(self, task, &TaskEvent::Completed(Err(err)));
                        });
                    }
                }
            }

            signal.resolve(match result {
                Ok(value) => Outcome::Success(value),
                Err(err) => Outcome::Failure(err),
            });
        }

        self.notify_if_idle();
        let channel = self.clone();
        self.inner
            .deferral
            .schedule(self.inner.spawner.as_ref(), Box::new(move || channel.attempt_dispatch()));
    }

    // ------------------------------------------------------------------
    // Cancellation
    // ------------------------------------------------------------------

    /// Cancel every queued task. Emits one `CANCELLED_ALL_TASKS`, then one
    /// `TASK_CANCELLED` per task in queue order. In-flight tasks keep running.
    ///
    /// Returns the number of cancelled tasks; an empty queue emits nothing.
    pub fn cancel_all(&self) -> usize {
        let guard = self.inner.state.lock();
        let cancelled = guard.borrow_mut().run_queue.take_all();
        let count = cancelled.len();
        if count == 0 {
            return 0;
        }

        tracing::info!(channel = %self.inner.name, count, "cancelling all queued tasks");
        self.emit(&ChannelEvent::CancelledAllTasks { count });
        for entry in cancelled {
            self.finish_cancelled(entry);
        }
        drop(guard);

        self.notify_if_idle();
        count
    }

    /// Cancel one queued task. Returns `false` if the task is unknown, already
    /// settled, or in flight (in-flight work cannot be cancelled).
    pub fn cancel_one(&self, id: TaskId) -> bool {
        let guard = self.inner.state.lock();
        let removed = guard.borrow_mut().run_queue.remove(id);
        let Some(entry) = removed else {
            return false;
        };

        tracing::info!(channel = %self.inner.name, task_id = id.0, "cancelling queued task");
        self.finish_cancelled(entry);
        drop(guard);

        self.notify_if_idle();
        true
    }

    fn finish_cancelled(&self, entry: Entry<Box<dyn PendingJob>>) {
        self.inner.counters.cancelled.fetch_add(1, Ordering::Relaxed);
        let Entry { info, job } = entry;
        self.emit(&ChannelEvent::TaskCancelled(&info));
        job.cancelled(self, &info);
    }

    // ------------------------------------------------------------------
    // Introspection and tuning
    // ------------------------------------------------------------------

    /// Maximum simultaneously in-flight tasks.
    pub fn concurrency_limit(&self) -> usize {
        self.inner.state.lock().borrow().concurrency_limit
    }

    /// Change the concurrency limit. Raising it dispatches queued tasks right
    /// away; lowering it lets in-flight work finish and throttles new starts.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::InvalidConfig`] for a limit of 0.
    pub fn set_concurrency_limit(&self, limit: usize) -> Result<(), ChannelError> {
        if limit == 0 {
            return Err(ChannelError::InvalidConfig(
                "concurrency_limit must be greater than 0".into(),
            ));
        }
        let guard = self.inner.state.lock();
        guard.borrow_mut().concurrency_limit = limit;
        tracing::debug!(channel = %self.inner.name, limit, "concurrency limit changed");
        self.attempt_dispatch();
        Ok(())
    }

    /// Number of queued (not yet started) tasks.
    pub fn queued_len(&self) -> usize {
        self.inner.state.lock().borrow().run_queue.len()
    }

    /// Number of tasks currently executing.
    pub fn in_flight_len(&self) -> usize {
        self.inner.state.lock().borrow().in_flight.len()
    }

    /// Queued tasks, head first.
    pub fn queued(&self) -> Vec<TaskInfo> {
        self.inner.state.lock().borrow().run_queue.snapshot()
    }

    /// Executing tasks, by id.
    pub fn in_flight(&self) -> Vec<TaskInfo> {
        self.inner
            .state
            .lock()
            .borrow()
            .in_flight
            .values()
            .cloned()
            .collect()
    }

    /// True when nothing is queued or executing.
    pub fn is_idle(&self) -> bool {
        let guard = self.inner.state.lock();
        let state = guard.borrow();
        state.run_queue.is_empty() && state.in_flight.is_empty()
    }

    /// Wait until nothing is queued or executing.
    ///
    /// Combined with [`Channel::cancel_all`] this drains the channel. There is
    /// no timeout; wrap in `tokio::time::timeout` if work may never settle.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }

    /// Utilization snapshot.
    pub fn stats(&self) -> ChannelStats {
        let (concurrency_limit, queued_tasks, in_flight_tasks) = {
            let guard = self.inner.state.lock();
            let state = guard.borrow();
            (state.concurrency_limit, state.run_queue.len(), state.in_flight.len())
        };
        let counters = &self.inner.counters;
        ChannelStats {
            concurrency_limit,
            queued_tasks,
            in_flight_tasks,
            submitted_tasks: counters.submitted.load(Ordering::Relaxed),
            rejected_tasks: counters.rejected.load(Ordering::Relaxed),
            started_tasks: counters.started.load(Ordering::Relaxed),
            completed_tasks: counters.completed.load(Ordering::Relaxed),
            failed_tasks: counters.failed.load(Ordering::Relaxed),
            cancelled_tasks: counters.cancelled.load(Ordering::Relaxed),
        }
    }

    fn emit(&self, event: &ChannelEvent<'_>) {
        if let Some(observer) = &self.inner.observer {
            self.guard_observer(event.kind(), || observer.on_event(self, event));
        }
    }

    /// Run observer code, containing a panic so queue and in-flight
    /// bookkeeping, handle resolution and the next dispatch round still happen.
    fn guard_observer(&self, kind: EventKind, deliver: impl FnOnce()) {
        if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(deliver)) {
            tracing::error!(
                channel = %self.inner.name,
                ?kind,
                panic = %panic_message(panic.as_ref()),
                "observer panicked"
            );
        }
    }

    fn notify_if_idle(&self) {
        if self.is_idle() {
            self.inner.idle.notify_waiters();
        }
    }
}

impl Default for Channel {
    fn default() -> Self {
        Self::new(1)
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.inner.state.lock();
        let state = guard.borrow();
        f.debug_struct("Channel")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("concurrency_limit", &state.concurrency_limit)
            .field("queued", &state.run_queue.len())
            .field("in_flight", &state.in_flight.len())
            .field("deferral", &self.inner.deferral)
            .finish_non_exhaustive()
    }
}
