// src/services/pool.rs

//! Bounded admission pool for delivery tasks.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{AppError, Result};

/// Fixed number of delivery slots shared by one coordinator.
#[derive(Debug, Clone)]
pub struct SlotPool {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// One occupied slot. Dropping it frees the slot, on every exit path
/// including unwinding.
#[derive(Debug)]
pub struct Slot {
    _permit: OwnedSemaphorePermit,
}

impl SlotPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Slots currently held by tasks.
    pub fn in_flight(&self) -> usize {
        self.capacity.saturating_sub(self.available())
    }

    /// Wait for a free slot for at most `grace`.
    ///
    /// Waiters are served in arrival order. Running out of time is an
    /// [`AppError::AdmissionTimeout`], which callers must treat as fatal.
    pub async fn acquire(&self, grace: Duration) -> Result<Slot> {
        // The semaphore is never closed, so a permit error cannot occur.
        let permit = Arc::clone(&self.semaphore).acquire_owned();
        match tokio::time::timeout(grace, permit).await {
            Ok(Ok(permit)) => Ok(Slot { _permit: permit }),
            _ => Err(AppError::AdmissionTimeout {
                waited: grace,
                capacity: self.capacity,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRACE: Duration = Duration::from_secs(300);

    #[tokio::test(start_paused = true)]
    async fn test_ceiling_blocks_next_admission() {
        let pool = SlotPool::new(2);
        let _a = pool.acquire(GRACE).await.unwrap();
        let _b = pool.acquire(GRACE).await.unwrap();
        assert_eq!(pool.in_flight(), 2);

        let third = pool.acquire(GRACE).await;
        assert!(matches!(
            third,
            Err(AppError::AdmissionTimeout { capacity: 2, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_unblocks_exactly_one_waiter() {
        let pool = SlotPool::new(1);
        let held = pool.acquire(GRACE).await.unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut waiters = Vec::new();
        for id in 0..2 {
            let pool = pool.clone();
            let tx = tx.clone();
            waiters.push(tokio::spawn(async move {
                let _slot = pool.acquire(GRACE).await.unwrap();
                tx.send(id).unwrap();
                // Hold the slot until the test ends.
                std::future::pending::<()>().await;
            }));
        }
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        assert!(rx.try_recv().is_err());

        drop(held);
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        assert_eq!(rx.try_recv(), Ok(0));
        assert!(rx.try_recv().is_err());
        assert_eq!(pool.in_flight(), 1);

        for waiter in waiters {
            waiter.abort();
        }
    }

    #[tokio::test]
    async fn test_slot_released_when_task_panics() {
        let pool = SlotPool::new(1);
        let slot = pool.acquire(GRACE).await.unwrap();
        let handle = tokio::spawn(async move {
            let _slot = slot;
            panic!("delivery blew up");
        });
        assert!(handle.await.unwrap_err().is_panic());
        assert_eq!(pool.available(), 1);
    }
}
