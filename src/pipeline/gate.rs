//! Admission control for concurrently running pipelines.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Returned if the gate's semaphore is closed. The gate never closes its
/// semaphore, so callers treat this as an internal error.
#[derive(Debug, Error)]
#[error("Concurrency gate is closed")]
pub struct GateClosed;

/// Counting admission gate bounding simultaneous pipelines.
///
/// At any instant at most `capacity` permits are outstanding. Dropping a
/// [`GatePermit`] frees its slot and wakes at most one suspended waiter; no
/// fairness beyond that is guaranteed.
#[derive(Clone)]
pub struct ConcurrencyGate {
    inner: Arc<Semaphore>,
    capacity: usize,
}

impl ConcurrencyGate {
    /// Creates a gate with the given capacity; zero is clamped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Suspends until a slot is free, then returns its RAII permit.
    pub async fn acquire(&self) -> Result<GatePermit, GateClosed> {
        let permit = Arc::clone(&self.inner)
            .acquire_owned()
            .await
            .map_err(|_| GateClosed)?;
        Ok(GatePermit { _permit: permit })
    }

    /// The configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Currently free slots.
    pub fn available(&self) -> usize {
        self.inner.available_permits()
    }
}

/// An occupied slot; dropping it releases the slot.
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}
