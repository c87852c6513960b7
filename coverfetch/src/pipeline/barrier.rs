//! Completion barrier for dispatched tasks.
//!
//! The dispatcher registers every task before spawning it and closes the
//! barrier once it will register no more. [`CompletionBarrier::wait`] returns
//! only when the barrier is closed and every registered task has completed,
//! so it can never report completion while dispatch is still under way.
//!
//! Each registration yields a [`CompletionGuard`]. Completing the guard
//! records the task's outcome; a guard dropped without completing (the task
//! panicked) counts as [`FailureKind::Aborted`].

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use super::types::{FailureCounts, FailureKind, PipelineError, TaskOutcome};

/// Counts reported by the barrier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BarrierCounts {
    pub registered: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failures: FailureCounts,
}

impl BarrierCounts {
    /// Tasks registered but not yet completed.
    pub fn outstanding(&self) -> usize {
        self.registered - self.succeeded - self.failed
    }
}

#[derive(Debug, Default)]
struct BarrierState {
    counts: BarrierCounts,
    closed: bool,
}

#[derive(Debug, Default)]
struct BarrierInner {
    state: Mutex<BarrierState>,
    notify: Notify,
}

/// Counting barrier shared by the dispatcher and its tasks.
#[derive(Debug, Clone, Default)]
pub struct CompletionBarrier {
    inner: Arc<BarrierInner>,
}

impl CompletionBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one more outstanding task.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::BarrierClosed` once [`close`](Self::close)
    /// has been called.
    pub fn register(&self) -> Result<CompletionGuard, PipelineError> {
        let mut state = self.inner.state.lock();
        if state.closed {
            return Err(PipelineError::BarrierClosed);
        }
        state.counts.registered += 1;

        Ok(CompletionGuard {
            inner: Arc::clone(&self.inner),
            completed: false,
        })
    }

    /// Seals registration. Idempotent.
    pub fn close(&self) {
        self.inner.state.lock().closed = true;
        self.inner.notify.notify_waiters();
    }

    /// Returns true once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    /// Snapshot of the current counts.
    pub fn counts(&self) -> BarrierCounts {
        self.inner.state.lock().counts
    }

    /// Waits until the barrier is closed and nothing is outstanding.
    pub async fn wait(&self) -> BarrierCounts {
        loop {
            // Register interest before checking so a completion landing
            // between the check and the await is not lost.
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let state = self.inner.state.lock();
                if state.closed && state.counts.outstanding() == 0 {
                    return state.counts;
                }
            }

            notified.await;
        }
    }
}

/// Proof of registration held by one task.
#[derive(Debug)]
pub struct CompletionGuard {
    inner: Arc<BarrierInner>,
    completed: bool,
}

impl CompletionGuard {
    /// Records the task's terminal state.
    pub fn complete(mut self, outcome: TaskOutcome) {
        self.record(outcome);
    }

    fn record(&mut self, outcome: TaskOutcome) {
        if self.completed {
            return;
        }
        self.completed = true;

        {
            let mut state = self.inner.state.lock();
            match outcome {
                TaskOutcome::Succeeded => state.counts.succeeded += 1,
                TaskOutcome::Failed(kind) => {
                    state.counts.failed += 1;
                    state.counts.failures.record(kind);
                }
            }
        }
        self.inner.notify.notify_waiters();
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if !self.completed {
            tracing::warn!("Task ended without reporting an outcome");
            self.record(TaskOutcome::Failed(FailureKind::Aborted));
        }
    }
}
