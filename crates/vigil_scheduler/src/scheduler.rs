//! Dispatch loop and admission control.

use crate::TaskHandle;
use crate::queue::QueuedTask;
use parking_lot::Mutex;
use std::collections::BinaryHeap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, oneshot};
use tracing::{debug, instrument, trace};
use vigil_core::Priority;

/// How long a stalled dispatcher parks before re-reading capacity.
const DEFAULT_STALL_WAIT: Duration = Duration::from_millis(50);

type CapacityFn = Arc<dyn Fn() -> usize + Send + Sync>;

/// Snapshot of scheduler occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Tasks waiting for a slot
    pub pending: usize,
    /// Tasks currently running
    pub active: usize,
    /// Tasks dispatched since creation
    pub dispatched: u64,
}

struct Inner {
    queue: Mutex<BinaryHeap<QueuedTask>>,
    sequence: AtomicU64,
    active: AtomicUsize,
    dispatched: AtomicU64,
    running: AtomicBool,
    notify: Notify,
    capacity: CapacityFn,
    stall_wait: Duration,
}

/// Decrements the active count on every exit path, panics included.
struct ActiveGuard(Arc<Inner>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
        self.0.notify.notify_one();
    }
}

/// Bounded-concurrency executor ordered by priority class then arrival.
///
/// Clones share the same queue. Must be used from within a tokio runtime.
#[derive(Clone)]
pub struct PriorityScheduler {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for PriorityScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriorityScheduler")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl PriorityScheduler {
    /// Create a scheduler whose concurrency cap is read from `capacity` each
    /// time a dispatch decision is made. A cap of zero is treated as one.
    pub fn new<F>(capacity: F) -> Self
    where
        F: Fn() -> usize + Send + Sync + 'static,
    {
        Self::with_stall_wait(capacity, DEFAULT_STALL_WAIT)
    }

    /// Create a scheduler with a fixed concurrency cap.
    pub fn fixed(cap: usize) -> Self {
        Self::new(move || cap)
    }

    /// Like [`new`](Self::new), with a custom park interval for the stalled
    /// dispatcher.
    pub fn with_stall_wait<F>(capacity: F, stall_wait: Duration) -> Self
    where
        F: Fn() -> usize + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                queue: Mutex::new(BinaryHeap::new()),
                sequence: AtomicU64::new(0),
                active: AtomicUsize::new(0),
                dispatched: AtomicU64::new(0),
                running: AtomicBool::new(false),
                notify: Notify::new(),
                capacity: Arc::new(capacity),
                stall_wait,
            }),
        }
    }

    /// Queue `task` under `priority` and start the dispatcher if idle.
    #[instrument(skip(self, task))]
    pub fn submit<F, T>(&self, priority: Priority, task: F) -> TaskHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let sequence = self.inner.sequence.fetch_add(1, Ordering::SeqCst);
        let job = Box::pin(async move {
            let output = task.await;
            let _ = tx.send(output);
        });
        self.inner.queue.lock().push(QueuedTask {
            priority,
            sequence,
            job,
        });
        trace!(sequence, "Task queued");
        self.inner.notify.notify_one();
        self.ensure_dispatcher();
        TaskHandle::new(rx)
    }

    /// Drop every task that has not started. Running tasks are unaffected.
    /// Handles of dropped tasks resolve to `Cancelled`.
    pub fn clear_pending(&self) -> usize {
        let drained: Vec<QueuedTask> = self.inner.queue.lock().drain().collect();
        let count = drained.len();
        drop(drained);
        if count > 0 {
            debug!(count, "Cleared pending tasks");
        }
        count
    }

    /// Tasks waiting for a slot.
    pub fn pending_len(&self) -> usize {
        self.inner.queue.lock().len()
    }

    /// Tasks currently running.
    pub fn active_count(&self) -> usize {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Whether the dispatch loop is alive.
    pub fn is_dispatching(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Occupancy snapshot.
    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            pending: self.pending_len(),
            active: self.active_count(),
            dispatched: self.inner.dispatched.load(Ordering::SeqCst),
        }
    }

    fn ensure_dispatcher(&self) {
        if self
            .inner
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            debug!("Starting dispatch loop");
            tokio::spawn(dispatch_loop(Arc::clone(&self.inner)));
        }
    }
}

async fn dispatch_loop(inner: Arc<Inner>) {
    loop {
        loop {
            let cap = (inner.capacity)().max(1);
            if inner.active.load(Ordering::SeqCst) >= cap {
                break;
            }
            let Some(task) = inner.queue.lock().pop() else {
                break;
            };
            inner.active.fetch_add(1, Ordering::SeqCst);
            inner.dispatched.fetch_add(1, Ordering::SeqCst);
            trace!(priority = %task.priority, sequence = task.sequence, cap, "Dispatching task");
            let guard = ActiveGuard(Arc::clone(&inner));
            tokio::spawn(async move {
                let _guard = guard;
                task.job.await;
            });
        }

        let idle = inner.queue.lock().is_empty() && inner.active.load(Ordering::SeqCst) == 0;
        if idle {
            inner.running.store(false, Ordering::SeqCst);
            // A submit racing the store above either sees `running == false`
            // and starts a new loop, or its task is visible here.
            let raced = !inner.queue.lock().is_empty();
            if raced
                && inner
                    .running
                    .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
            {
                continue;
            }
            debug!("Dispatch loop idle, exiting");
            return;
        }

        // Stalled or waiting on running tasks: park until a slot frees, a
        // task arrives, or the capacity may have changed.
        let _ = tokio::time::timeout(inner.stall_wait, inner.notify.notified()).await;
    }
}
