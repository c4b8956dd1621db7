//! Delayed-task scheduling behind a small capability trait.
//!
//! [`TokioScheduler`] runs tasks on a Tokio runtime in real (or paused) time.
//! [`ManualScheduler`] keeps a virtual clock that only moves when
//! [`ManualScheduler::advance`] is called.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::Weak;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::Instant;

use crate::error::FeedError;

/// Work run once when its delay elapses.
pub type ScheduledTask = Box<dyn FnOnce() + Send + 'static>;

/// Cancels a pending [`ScheduledTask`]. Cancelling twice, or after the task
/// ran, does nothing.
pub trait Cancel: Send + Sync {
    fn cancel(&self);
}

pub trait Scheduler: Send + Sync {
    /// Runs `task` once after `delay`.
    fn schedule(&self, delay: Duration, task: ScheduledTask) -> Box<dyn Cancel>;

    /// Monotonic milliseconds since this scheduler was created.
    fn now_millis(&self) -> u64;
}

pub struct TokioScheduler {
    handle: Handle,
    epoch: Instant,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            epoch: Instant::now(),
        }
    }

    /// Uses the runtime the caller is running on.
    pub fn current() -> Result<Self, FeedError> {
        let handle = Handle::try_current().map_err(|_| FeedError::NoRuntime)?;
        Ok(Self::new(handle))
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: ScheduledTask) -> Box<dyn Cancel> {
        let join = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
        Box::new(TokioCancel(join.abort_handle()))
    }

    fn now_millis(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }
}

struct TokioCancel(AbortHandle);

impl Cancel for TokioCancel {
    fn cancel(&self) {
        self.0.abort();
    }
}

#[derive(Default)]
struct ManualQueue {
    now: u64,
    next_seq: u64,
    // Keyed by (due time, insertion order) so equal deadlines run FIFO.
    pending: BTreeMap<(u64, u64), ScheduledTask>,
}

/// Virtual-time scheduler. Nothing runs until [`ManualScheduler::advance`].
#[derive(Clone, Default)]
pub struct ManualScheduler {
    queue: Arc<Mutex<ManualQueue>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward by `by`, running every task that falls due,
    /// in deadline order. Tasks scheduled while advancing run too if they
    /// fall due before the new time.
    pub fn advance(&self, by: Duration) {
        let target = self.lock().now + by.as_millis() as u64;
        loop {
            let task = {
                let mut queue = self.lock();
                let due = queue
                    .pending
                    .first_key_value()
                    .map(|(key, _)| *key)
                    .filter(|(at, _)| *at <= target);
                match due {
                    Some(key) => {
                        queue.now = key.0;
                        queue.pending.remove(&key)
                    }
                    None => None,
                }
            };
            match task {
                Some(task) => task(),
                None => break,
            }
        }
        self.lock().now = target;
    }

    /// Number of tasks waiting to run.
    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: ScheduledTask) -> Box<dyn Cancel> {
        let mut queue = self.lock();
        let key = (queue.now + delay.as_millis() as u64, queue.next_seq);
        queue.next_seq += 1;
        queue.pending.insert(key, task);
        Box::new(ManualCancel {
            queue: Arc::downgrade(&self.queue),
            key,
        })
    }

    fn now_millis(&self) -> u64 {
        self.lock().now
    }
}

struct ManualCancel {
    queue: Weak<Mutex<ManualQueue>>,
    key: (u64, u64),
}

impl Cancel for ManualCancel {
    fn cancel(&self) {
        if let Some(queue) = self.queue.upgrade() {
            queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pending
                .remove(&self.key);
        }
    }
}
