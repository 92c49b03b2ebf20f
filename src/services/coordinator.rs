// src/services/coordinator.rs

//! Dispatch coordinator.
//!
//! A single sequential loop reads the change feed and admits every event
//! into a bounded pool of delivery tasks. The loop never waits for a task
//! to finish; it only waits for a free slot, and only for the admission
//! grace period. Running out of grace is fatal.
//!
//! ```text
//! WaitingForEvent --event--> Admitting --slot--> Dispatched --> WaitingForEvent
//! WaitingForEvent --idle---> Probing ------------------------> WaitingForEvent
//! Admitting --grace exceeded--> Fatal
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::{JoinError, JoinSet};

use crate::error::{AppError, Result};
use crate::models::{ChangeEvent, DispatchConfig};
use crate::services::feed::ChangeFeed;
use crate::services::notifier::{DeliveryOutcome, Notifier};
use crate::services::pool::SlotPool;

/// Position in the coordinator state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    WaitingForEvent,
    Admitting,
    Dispatched,
    Probing,
    Fatal,
}

/// Why [`Coordinator::next`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// An event was admitted and its delivery task started.
    Dispatched,
    /// An undecodable event was dropped.
    Dropped,
    /// Nothing arrived within the idle timeout; the feed was probed.
    Idle,
    /// The feed failed and was reconnected.
    Reconnected,
    /// The feed has ended.
    Closed,
}

/// Counters for one coordinator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub received: usize,
    pub dispatched: usize,
    pub dropped: usize,
    pub probes: usize,
    pub reconnects: usize,
    pub delivered: usize,
    pub rejected: usize,
    pub exhausted: usize,
    pub failed: usize,
}

impl DispatchStats {
    /// Tasks whose outcome has been collected.
    pub fn completed(&self) -> usize {
        self.delivered + self.rejected + self.exhausted + self.failed
    }
}

pub struct Coordinator {
    pool: SlotPool,
    notifier: Arc<Notifier>,
    idle_timeout: Duration,
    admission_grace: Duration,
    tasks: JoinSet<DeliveryOutcome>,
    stats: DispatchStats,
    state: CoordinatorState,
}

impl Coordinator {
    pub fn new(config: &DispatchConfig, notifier: Arc<Notifier>) -> Self {
        Self {
            pool: SlotPool::new(config.pool_size),
            notifier,
            idle_timeout: config.idle_timeout(),
            admission_grace: config.admission_grace(),
            tasks: JoinSet::new(),
            stats: DispatchStats::default(),
            state: CoordinatorState::WaitingForEvent,
        }
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    /// Delivery tasks currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.pool.in_flight()
    }

    /// Handle the next thing the feed produces.
    ///
    /// Returns after one event is admitted or dropped, after an idle
    /// timeout, or when the feed ends. An `Err` that [`AppError::is_fatal`]
    /// leaves the coordinator in [`CoordinatorState::Fatal`].
    pub async fn next<F>(&mut self, feed: &mut F) -> Result<Wake>
    where
        F: ChangeFeed + ?Sized,
    {
        if self.state == CoordinatorState::Fatal {
            return Err(AppError::Halted);
        }
        self.reap();
        self.state = CoordinatorState::WaitingForEvent;

        let raw = match tokio::time::timeout(self.idle_timeout, feed.recv()).await {
            Err(_) => {
                self.state = CoordinatorState::Probing;
                self.stats.probes += 1;
                if let Err(e) = feed.probe() {
                    log::warn!("Change feed probe failed: {}", e);
                }
                self.state = CoordinatorState::WaitingForEvent;
                return Ok(Wake::Idle);
            }
            Ok(Err(e)) => {
                log::warn!("Change feed failed: {}. Reconnecting", e);
                feed.reconnect().await?;
                self.stats.reconnects += 1;
                return Ok(Wake::Reconnected);
            }
            Ok(Ok(None)) => return Ok(Wake::Closed),
            Ok(Ok(Some(raw))) => raw,
        };
        self.stats.received += 1;

        let event = match ChangeEvent::decode(&raw) {
            Ok(event) => event,
            Err(e) => {
                log::warn!("Dropping change event: {}", e);
                self.stats.dropped += 1;
                return Ok(Wake::Dropped);
            }
        };

        self.state = CoordinatorState::Admitting;
        let slot = match self.pool.acquire(self.admission_grace).await {
            Ok(slot) => slot,
            Err(e) => {
                self.state = CoordinatorState::Fatal;
                log::error!("{} while admitting {}", e, event.topic);
                return Err(e);
            }
        };

        let notifier = Arc::clone(&self.notifier);
        self.tasks.spawn(async move {
            let _slot = slot;
            notifier.deliver(&event).await
        });
        self.stats.dispatched += 1;
        self.state = CoordinatorState::Dispatched;
        Ok(Wake::Dispatched)
    }

    /// Consume the feed until it ends, then wait for in-flight deliveries.
    ///
    /// A fatal error returns at once and leaves in-flight tasks alone.
    pub async fn run<F>(&mut self, feed: &mut F) -> Result<DispatchStats>
    where
        F: ChangeFeed + ?Sized,
    {
        log::info!(
            "Dispatching with {} slots, idle timeout {:?}, admission grace {:?}",
            self.pool.capacity(),
            self.idle_timeout,
            self.admission_grace
        );
        loop {
            match self.next(feed).await {
                Ok(Wake::Closed) => break,
                Ok(Wake::Idle) => log::debug!("Change feed idle, probed"),
                Ok(_) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    self.drain().await;
                    return Err(e);
                }
            }
        }
        self.drain().await;
        Ok(self.stats)
    }

    /// Wait for every in-flight delivery and collect its outcome.
    pub async fn drain(&mut self) {
        if !self.tasks.is_empty() {
            log::info!("Waiting for {} in-flight deliveries", self.tasks.len());
        }
        while let Some(joined) = self.tasks.join_next().await {
            self.collect(joined);
        }
    }

    /// Collect outcomes of tasks that already finished.
    fn reap(&mut self) {
        while let Some(joined) = self.tasks.try_join_next() {
            self.collect(joined);
        }
    }

    fn collect(&mut self, joined: std::result::Result<DeliveryOutcome, JoinError>) {
        match joined {
            Ok(DeliveryOutcome::Delivered { .. }) => self.stats.delivered += 1,
            Ok(DeliveryOutcome::Rejected { .. }) => self.stats.rejected += 1,
            Ok(DeliveryOutcome::Exhausted { .. }) => self.stats.exhausted += 1,
            Ok(DeliveryOutcome::Failed { .. }) => self.stats.failed += 1,
            Err(e) => {
                log::error!("Delivery task aborted: {}", e);
                self.stats.failed += 1;
            }
        }
    }
}
