//! Per-route concurrency gate.
//!
//! # Responsibilities
//! - Bound the number of in-flight requests to a fixed capacity
//! - Reject immediately (Drop) or wait for a slot (Queue) when full
//! - Release the slot exactly once per admission
//!
//! # Design Decisions
//! - `occupied` is derived from the semaphore, so it cannot drift from the
//!   permits actually handed out
//! - Waiters are woken in FIFO order by the semaphore
//! - Closing the gate releases queued waiters as `Rejected::Closed`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

/// What happens to a request that arrives while the route is at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Wait until another request leaves.
    Queue,
    /// Reject immediately.
    Drop,
}

impl OverflowPolicy {
    /// Map the `drop_over_limit` configuration flag to a policy.
    pub fn from_drop_flag(drop_over_limit: bool) -> Self {
        if drop_over_limit {
            OverflowPolicy::Drop
        } else {
            OverflowPolicy::Queue
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OverflowPolicy::Queue => "queue",
            OverflowPolicy::Drop => "drop",
        }
    }
}

impl std::fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reason a request was not admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejected {
    /// The route is full and configured to drop.
    #[error("route is at capacity")]
    AtCapacity,
    /// The gate was closed (shutdown) before a slot could be taken.
    #[error("admission gate is closed")]
    Closed,
}

/// Concurrency gate for a single route.
#[derive(Debug)]
pub struct AdmissionController {
    slots: Arc<Semaphore>,
    capacity: usize,
    policy: OverflowPolicy,
    /// Callers currently suspended in `enter`.
    waiting: AtomicUsize,
}

impl AdmissionController {
    /// Create a gate with `capacity` slots.
    ///
    /// # Panics
    /// If `capacity` exceeds [`Semaphore::MAX_PERMITS`]. Configuration
    /// validation rejects such values before a gate is built.
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
            policy,
            waiting: AtomicUsize::new(0),
        }
    }

    /// Try to take a slot.
    ///
    /// A free slot is taken without suspending. When the gate is full, the
    /// Drop policy returns [`Rejected::AtCapacity`] at once and leaves the
    /// gate untouched; the Queue policy suspends until a slot is released.
    pub async fn enter(&self) -> Result<AdmissionPermit, Rejected> {
        match self.slots.clone().try_acquire_owned() {
            Ok(permit) => return Ok(AdmissionPermit::new(permit, false)),
            Err(TryAcquireError::Closed) => return Err(Rejected::Closed),
            Err(TryAcquireError::NoPermits) => {}
        }

        if self.policy == OverflowPolicy::Drop {
            return Err(Rejected::AtCapacity);
        }

        let _waiting = WaitingGuard::new(&self.waiting);
        let permit = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Rejected::Closed)?;

        Ok(AdmissionPermit::new(permit, true))
    }

    /// Number of admitted requests that have not left yet.
    pub fn occupied(&self) -> usize {
        self.capacity.saturating_sub(self.slots.available_permits())
    }

    /// Number of callers suspended waiting for a slot.
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Close the gate. Queued and future callers are rejected; requests that
    /// already hold a permit are unaffected.
    pub fn close(&self) {
        self.slots.close();
    }

    pub fn is_closed(&self) -> bool {
        self.slots.is_closed()
    }
}

/// A held slot. Dropping it releases the slot.
#[derive(Debug)]
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
    waited: bool,
}

impl AdmissionPermit {
    fn new(permit: OwnedSemaphorePermit, waited: bool) -> Self {
        Self {
            _permit: permit,
            waited,
        }
    }

    /// True if the caller had to queue before being admitted.
    pub fn waited(&self) -> bool {
        self.waited
    }

    /// Release the slot.
    pub fn leave(self) {
        drop(self);
    }
}

/// Counts a caller as waiting for as long as the guard lives, including
/// when the waiting future is dropped before admission.
struct WaitingGuard<'a> {
    waiting: &'a AtomicUsize,
}

impl<'a> WaitingGuard<'a> {
    fn new(waiting: &'a AtomicUsize) -> Self {
        waiting.fetch_add(1, Ordering::SeqCst);
        Self { waiting }
    }
}

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.waiting.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::Instant;

    #[tokio::test]
    async fn admits_up_to_capacity() {
        let gate = AdmissionController::new(2, OverflowPolicy::Drop);
        assert_eq!(gate.occupied(), 0);

        let a = gate.enter().await.unwrap();
        assert_eq!(gate.occupied(), 1);
        let b = gate.enter().await.unwrap();
        assert_eq!(gate.occupied(), 2);
        assert!(!a.waited());
        assert!(!b.waited());
    }

    #[tokio::test]
    async fn drop_policy_rejects_without_changing_occupancy() {
        let gate = AdmissionController::new(1, OverflowPolicy::Drop);
        let _held = gate.enter().await.unwrap();

        let err = gate.enter().await.unwrap_err();
        assert_eq!(err, Rejected::AtCapacity);
        assert_eq!(gate.occupied(), 1);
        assert_eq!(gate.waiting(), 0);
    }

    #[tokio::test]
    async fn leave_restores_occupancy() {
        let gate = AdmissionController::new(3, OverflowPolicy::Queue);
        let before = gate.occupied();

        let permit = gate.enter().await.unwrap();
        assert_eq!(gate.occupied(), before + 1);
        permit.leave();
        assert_eq!(gate.occupied(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn queue_policy_waits_for_leave() {
        let gate = Arc::new(AdmissionController::new(1, OverflowPolicy::Queue));
        let held = gate.enter().await.unwrap();

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move {
                let start = Instant::now();
                let permit = gate.enter().await;
                (permit.map(|p| p.waited()), start.elapsed())
            })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(gate.waiting(), 1);
        assert_eq!(gate.occupied(), 1);

        held.leave();
        let (waited, elapsed) = waiter.await.unwrap();
        assert_eq!(waited, Ok(true));
        assert!(elapsed >= Duration::from_secs(1));
        assert_eq!(gate.waiting(), 0);
        assert_eq!(gate.occupied(), 0);
    }

    #[tokio::test]
    async fn queue_policy_never_rejects_while_open() {
        let gate = Arc::new(AdmissionController::new(2, OverflowPolicy::Queue));
        let mut tasks = Vec::new();
        for _ in 0..20 {
            let gate = gate.clone();
            tasks.push(tokio::spawn(async move {
                let permit = gate.enter().await?;
                tokio::task::yield_now().await;
                permit.leave();
                Ok::<_, Rejected>(())
            }));
        }
        for task in tasks {
            assert!(task.await.unwrap().is_ok());
        }
        assert_eq!(gate.occupied(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn occupancy_never_exceeds_capacity() {
        let gate = Arc::new(AdmissionController::new(3, OverflowPolicy::Queue));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..64 {
            let gate = gate.clone();
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            tasks.push(tokio::spawn(async move {
                let permit = gate.enter().await.unwrap();
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                assert!(gate.occupied() <= gate.capacity());
                tokio::time::sleep(Duration::from_millis(2)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                permit.leave();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(gate.occupied(), 0);
    }

    #[tokio::test]
    async fn permit_released_when_holder_panics() {
        let gate = Arc::new(AdmissionController::new(1, OverflowPolicy::Drop));
        let task = {
            let gate = gate.clone();
            tokio::spawn(async move {
                let _permit = gate.enter().await.unwrap();
                panic!("forwarding blew up");
            })
        };
        assert!(task.await.unwrap_err().is_panic());
        assert_eq!(gate.occupied(), 0);
        assert!(gate.enter().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn close_releases_queued_waiters() {
        let gate = Arc::new(AdmissionController::new(1, OverflowPolicy::Queue));
        let _held = gate.enter().await.unwrap();

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.enter().await.map(|_| ()) })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(gate.waiting(), 1);

        gate.close();
        assert_eq!(waiter.await.unwrap(), Err(Rejected::Closed));
        assert!(gate.is_closed());
        assert_eq!(gate.enter().await.unwrap_err(), Rejected::Closed);
    }

    #[test]
    fn policy_from_flag() {
        assert_eq!(OverflowPolicy::from_drop_flag(true), OverflowPolicy::Drop);
        assert_eq!(OverflowPolicy::from_drop_flag(false), OverflowPolicy::Queue);
        assert_eq!(OverflowPolicy::Drop.to_string(), "drop");
    }
}
