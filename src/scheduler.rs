//! Scheduler Module
//!
//! Clock and timer registration used by the cache for per-key eviction.
//!
//! Two implementations:
//! - [`TokioScheduler`] spawns one tokio task per timer; honours `tokio::time::pause`.
//! - [`ManualScheduler`] keeps a virtual clock that only moves on [`ManualScheduler::advance`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use tokio::task::AbortHandle;

/// Work run when a timer fires.
pub type TimerTask = Box<dyn FnOnce() + Send + 'static>;

// == Scheduler Trait ==
/// Source of time and one-shot timers.
pub trait Scheduler: Send + Sync {
    /// Current instant on this scheduler's clock.
    fn now(&self) -> Instant;

    /// Runs `task` once after `delay`, unless the returned handle is cancelled first.
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle;
}

// == Timer Handle ==
/// Cancellation handle for a scheduled task.
#[derive(Debug)]
pub struct TimerHandle {
    cancelled: Arc<AtomicBool>,
    abort: Option<AbortHandle>,
}

impl TimerHandle {
    /// Handle for a custom [`Scheduler`] that checks `cancelled` before firing.
    pub fn new(cancelled: Arc<AtomicBool>) -> Self {
        Self {
            cancelled,
            abort: None,
        }
    }

    fn with_abort(cancelled: Arc<AtomicBool>, abort: AbortHandle) -> Self {
        Self {
            cancelled,
            abort: Some(abort),
        }
    }

    /// Prevents the task from running. Safe to call more than once or after
    /// the timer already fired.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        if let Some(abort) = &self.abort {
            abort.abort();
        }
    }

    /// Whether [`TimerHandle::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

// == Tokio Scheduler ==
/// Timers backed by tokio tasks.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    /// Binds to the runtime the caller is running on.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn current() -> Self {
        Self::from_handle(Handle::current())
    }

    /// Binds to an explicit runtime handle.
    pub fn from_handle(handle: Handle) -> Self {
        Self { handle }
    }
}

impl Scheduler for TokioScheduler {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);

        let join = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if !flag.load(Ordering::Acquire) {
                task();
            }
        });

        TimerHandle::with_abort(cancelled, join.abort_handle())
    }
}

// == Manual Scheduler ==
/// Virtual clock for deterministic tests and single-threaded hosts.
pub struct ManualScheduler {
    state: Mutex<ManualState>,
}

struct ManualState {
    origin: Instant,
    elapsed: Duration,
    next_seq: u64,
    pending: Vec<PendingTimer>,
}

struct PendingTimer {
    due: Duration,
    seq: u64,
    cancelled: Arc<AtomicBool>,
    task: TimerTask,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ManualState {
                origin: Instant::now(),
                elapsed: Duration::ZERO,
                next_seq: 0,
                pending: Vec::new(),
            }),
        }
    }

    /// Time passed on the virtual clock since creation.
    pub fn elapsed(&self) -> Duration {
        self.lock().elapsed
    }

    /// Number of timers that are neither fired nor cancelled.
    pub fn pending(&self) -> usize {
        self.lock()
            .pending
            .iter()
            .filter(|t| !t.cancelled.load(Ordering::Acquire))
            .count()
    }

    /// Moves the clock forward by `by`, firing every timer that falls due.
    ///
    /// Timers fire in due order (registration order on ties) with the clock
    /// set to their due time. Tasks run without the scheduler lock held, so
    /// they may schedule or cancel other timers.
    pub fn advance(&self, by: Duration) {
        let target = self.lock().elapsed.saturating_add(by);

        loop {
            let next = {
                let mut state = self.lock();
                state
                    .pending
                    .retain(|t| !t.cancelled.load(Ordering::Acquire));

                let due_index = state
                    .pending
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.due <= target)
                    .min_by_key(|(_, t)| (t.due, t.seq))
                    .map(|(i, _)| i);

                match due_index {
                    Some(index) => {
                        let timer = state.pending.swap_remove(index);
                        state.elapsed = state.elapsed.max(timer.due);
                        timer
                    }
                    None => {
                        state.elapsed = target;
                        break;
                    }
                }
            };

            if !next.cancelled.load(Ordering::Acquire) {
                (next.task)();
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("elapsed", &self.elapsed())
            .field("pending", &self.pending())
            .finish()
    }
}

impl Scheduler for ManualScheduler {
    fn now(&self) -> Instant {
        let state = self.lock();
        state.origin + state.elapsed
    }

    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let mut state = self.lock();
        let seq = state.next_seq;
        state.next_seq += 1;
        let due = state.elapsed.saturating_add(delay);
        state.pending.push(PendingTimer {
            due,
            seq,
            cancelled: Arc::clone(&cancelled),
            task,
        });

        TimerHandle::new(cancelled)
    }
}
