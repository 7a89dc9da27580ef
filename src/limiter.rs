//! Global admission control.
//!
//! A counting semaphore caps in-flight requests at the configured rate
//! limit; an in-flight counter feeds the readiness capacity check and lets
//! shutdown wait for outstanding work to drain.

use crate::errors::LookupError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};
use tokio::time::timeout;
use tracing::info;

pub struct AdmissionControl {
    semaphore: Arc<Semaphore>,
    limit: usize,
    in_flight: AtomicUsize,
    drained: Notify,
}

/// RAII admission slot; releases the semaphore and decrements the in-flight
/// counter on drop.
pub struct AdmissionPermit {
    control: Arc<AdmissionControl>,
    _permit: OwnedSemaphorePermit,
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        if self.control.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.control.drained.notify_waiters();
        }
        crate::metrics::set_in_flight(self.control.in_flight());
    }
}

impl AdmissionControl {
    pub fn new(limit: usize) -> Arc<Self> {
        Arc::new(Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
            in_flight: AtomicUsize::new(0),
            drained: Notify::new(),
        })
    }

    /// Block until a slot frees up. FIFO per the underlying semaphore; no
    /// further fairness guarantee.
    pub async fn acquire(self: &Arc<Self>) -> Result<AdmissionPermit, LookupError> {
        if self.semaphore.available_permits() == 0 {
            info!("Rate limit reached, waiting for a slot to become available...");
        }
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| LookupError::Cache("admission semaphore closed".to_string()))?;
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        Ok(AdmissionPermit {
            control: self.clone(),
            _permit: permit,
        })
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn at_capacity(&self) -> bool {
        self.in_flight() >= self.limit
    }

    /// Wait for all admitted requests to finish, up to `deadline`. Returns
    /// whether the drain completed.
    pub async fn drain(&self, deadline: Duration) -> bool {
        timeout(deadline, async {
            loop {
                if self.in_flight() == 0 {
                    return;
                }
                let notified = self.drained.notified();
                if self.in_flight() == 0 {
                    return;
                }
                notified.await;
            }
        })
        .await
        .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tracks_in_flight_count() {
        let control = AdmissionControl::new(4);
        assert_eq!(control.in_flight(), 0);

        let first = control.acquire().await.unwrap();
        let second = control.acquire().await.unwrap();
        assert_eq!(control.in_flight(), 2);
        assert!(!control.at_capacity());

        drop(first);
        drop(second);
        assert_eq!(control.in_flight(), 0);
    }

    #[tokio::test]
    async fn blocks_at_capacity() {
        let control = AdmissionControl::new(1);
        let held = control.acquire().await.unwrap();
        assert!(control.at_capacity());

        let waiter = control.clone();
        let pending = tokio::spawn(async move { waiter.acquire().await.unwrap() });

        // The second acquire cannot complete while the slot is held.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!pending.is_finished());

        drop(held);
        let permit = pending.await.unwrap();
        assert_eq!(control.in_flight(), 1);
        drop(permit);
    }

    #[tokio::test]
    async fn drain_completes_when_idle() {
        let control = AdmissionControl::new(2);
        assert!(control.drain(Duration::from_millis(50)).await);
    }

    #[tokio::test]
    async fn drain_waits_for_outstanding_permits() {
        let control = AdmissionControl::new(2);
        let permit = control.acquire().await.unwrap();

        assert!(!control.drain(Duration::from_millis(30)).await);

        let holder = control.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            drop(permit);
            let _ = holder;
        });

        assert!(control.drain(Duration::from_secs(1)).await);
    }
}
