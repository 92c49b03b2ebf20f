// src/lib.rs

//! Catalog Fanout Library
//!
//! Diffs successive course catalog snapshots down to the sections that
//! changed and delivers one push notification per change through a
//! bounded pool of delivery tasks.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
