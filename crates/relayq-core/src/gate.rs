//! Admission gate
//!
//! A bounded counting semaphore that caps how many relay tasks may be
//! in flight at once. Admission happens on the channel's dispatch path,
//! so a full gate stalls message intake until a slot frees up. This is
//! the relay's only backpressure mechanism.

use std::sync::Arc;

use relayq_types::{Error, Result};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Caps the number of concurrently running relay tasks
pub struct AdmissionGate {
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl AdmissionGate {
    /// Create a gate with the given number of slots
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero; a zero-slot gate would stall the
    /// dispatch path forever.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "admission gate capacity must be greater than zero");
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait for a free slot
    ///
    /// Resolves once a slot is available; the slot is held until the
    /// returned permit is dropped. Fails only if the gate has been
    /// closed, which the caller must treat as fatal.
    pub async fn admit(&self) -> Result<OwnedSemaphorePermit> {
        Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| Error::GateClosed)
    }

    /// Number of slots currently handed out
    pub fn in_flight(&self) -> usize {
        self.capacity.saturating_sub(self.permits.available_permits())
    }

    /// Total number of slots
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Close the gate so that every subsequent admission fails
    ///
    /// Slots already handed out are unaffected.
    pub fn close(&self) {
        self.permits.close();
    }
}
