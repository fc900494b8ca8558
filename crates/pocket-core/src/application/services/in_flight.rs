//! Tracking of outstanding fetch tasks.
//!
//! Tasks are spawned onto the runtime and counted through a `watch` channel.
//! [`InFlight::drained`] resolves when the count reaches zero, which also
//! covers tasks spawned by other tasks while waiting: a child is counted
//! before its parent finishes. Waiting is cancel-safe, so a timed-out waiter
//! leaves every task running and still tracked.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::trace;

#[derive(Debug)]
pub struct InFlight {
    count: Arc<watch::Sender<usize>>,
    spawned_total: AtomicU64,
}

/// Decrements the count when the task ends, including by panic.
struct FlightGuard(Arc<watch::Sender<usize>>);

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.0.send_modify(|n| *n = n.saturating_sub(1));
    }
}

impl Default for InFlight {
    fn default() -> Self {
        Self::new()
    }
}

impl InFlight {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0usize);
        Self {
            count: Arc::new(tx),
            spawned_total: AtomicU64::new(0),
        }
    }

    /// Spawn `task` and count it until it completes.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.count.send_modify(|n| *n += 1);
        let total = self.spawned_total.fetch_add(1, Ordering::Relaxed) + 1;
        trace!(pending = *self.count.borrow(), spawned_total = total, "fetch.spawn");

        let guard = FlightGuard(self.count.clone());
        tokio::spawn(async move {
            let _guard = guard;
            task.await;
        });
    }

    pub fn pending(&self) -> usize {
        *self.count.borrow()
    }

    pub fn spawned_total(&self) -> u64 {
        self.spawned_total.load(Ordering::Relaxed)
    }

    /// Resolve once nothing is in flight.
    pub async fn drained(&self) {
        let mut rx = self.count.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test]
    async fn drained_waits_for_every_task() {
        let flights = InFlight::new();
        let done = Arc::new(AtomicUsize::new(0));
        for ms in [30u64, 10, 20] {
            let done = done.clone();
            flights.spawn(async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                done.fetch_add(1, Ordering::SeqCst);
            });
        }
        flights.drained().await;
        assert_eq!(done.load(Ordering::SeqCst), 3);
        assert_eq!(flights.pending(), 0);
        assert_eq!(flights.spawned_total(), 3);
    }

    #[tokio::test]
    async fn drained_catches_tasks_spawned_by_tasks() {
        let flights = Arc::new(InFlight::new());
        let done = Arc::new(AtomicUsize::new(0));
        let (f, d) = (flights.clone(), done.clone());
        flights.spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            let d2 = d.clone();
            f.spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                d2.fetch_add(1, Ordering::SeqCst);
            });
            d.fetch_add(1, Ordering::SeqCst);
        });
        flights.drained().await;
        assert_eq!(done.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn panicking_task_still_settles() {
        let flights = InFlight::new();
        flights.spawn(async { panic!("task blew up") });
        tokio::time::timeout(Duration::from_secs(1), flights.drained())
            .await
            .expect("drain should settle after a panic");
    }

    #[tokio::test]
    async fn timed_out_wait_leaves_tasks_tracked() {
        let flights = InFlight::new();
        flights.spawn(tokio::time::sleep(Duration::from_millis(50)));
        let early = tokio::time::timeout(Duration::from_millis(5), flights.drained()).await;
        assert!(early.is_err());
        assert_eq!(flights.pending(), 1);
        flights.drained().await;
        assert_eq!(flights.pending(), 0);
    }
}
