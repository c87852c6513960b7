//! Admission controller for per-record tasks.
//!
//! A fixed-capacity token pool that caps how many tasks execute at once.
//! Acquisition is scoped: [`AdmissionController::acquire`] returns an
//! [`AdmissionPermit`] and dropping the permit returns the token, so release
//! happens on every exit path of a task body, including panics.
//!
//! ```text
//! Capacity: 10
//! ├── in flight: 7   (permits held by running tasks)
//! └── available: 3   (next acquire() returns immediately)
//! ```
//!
//! The controller also records the highest number of permits ever held at
//! once, which the run summary reports.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::types::PipelineError;

/// Default number of concurrently executing tasks.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Fixed-capacity token pool.
#[derive(Debug)]
pub struct AdmissionController {
    /// Semaphore holding the tokens
    semaphore: Arc<Semaphore>,

    /// Number of tokens; never changes after construction
    capacity: usize,

    /// Current number of permits held.
    /// Uses Arc so permits are 'static and can move into spawned tasks.
    in_flight: Arc<AtomicUsize>,

    /// Highest value `in_flight` has reached
    peak_in_flight: Arc<AtomicUsize>,
}

impl AdmissionController {
    /// Creates a controller with `capacity` tokens. A capacity of zero is
    /// raised to one so the pool can always make progress.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);

        tracing::debug!(capacity, "Created admission controller");

        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Waits until a token is available and takes it.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::AdmissionClosed` if the pool was closed while
    /// waiting.
    pub async fn acquire(&self) -> Result<AdmissionPermit, PipelineError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PipelineError::AdmissionClosed)?;

        Ok(self.track(permit))
    }

    /// Closes the pool once dispatch is over. Pending and future `acquire`
    /// calls fail; permits already handed out stay valid until dropped.
    pub fn close(&self) {
        self.semaphore.close();
    }

    fn track(&self, permit: OwnedSemaphorePermit) -> AdmissionPermit {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        AdmissionPermit {
            _permit: permit,
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    /// Total number of tokens.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Tokens not currently held.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Permits currently held.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of permits held at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

impl Default for AdmissionController {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

/// A held admission token.
///
/// Automatically released when dropped.
#[derive(Debug)]
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl AdmissionPermit {
    /// Returns the token explicitly. Equivalent to dropping the permit.
    pub fn release(self) {}
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
