// src/services/mod.rs

//! Service layer for the fanout application.
//!
//! This module contains the delivery machinery:
//! - Change feed adapters (`ChangeFeed`, `ChannelFeed`, `LineFeed`)
//! - Bounded admission (`SlotPool`) and the dispatch loop (`Coordinator`)
//! - Per-event delivery with retry (`Notifier`, `RetryPolicy`)
//! - Push gateway transport (`PushGateway`, `HttpGateway`)

pub mod coordinator;
pub mod feed;
pub mod gateway;
pub mod notifier;
pub mod pool;
pub mod retry;

pub use coordinator::{Coordinator, CoordinatorState, DispatchStats, Wake};
pub use feed::{ChangeFeed, ChannelFeed, FeedCounters, LineFeed};
pub use gateway::{HttpGateway, PushGateway};
pub use notifier::{DeliveryOutcome, Notifier};
pub use pool::{Slot, SlotPool};
pub use retry::RetryPolicy;
