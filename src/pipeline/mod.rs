// src/pipeline/mod.rs

//! Pipeline entry points.
//!
//! - `diff`: Reduce two catalog snapshots to the changed subtrees
//! - `events_from_diff`: Split a pruned catalog into change events
//! - `run_ingest`: Diff a new snapshot against the stored one
//! - `run_dispatch`: Fan change events out to the push gateway

pub mod diff;
pub mod dispatch;
pub mod events;
pub mod ingest;

pub use diff::{DiffSummary, diff};
pub use dispatch::{run_dispatch, run_dispatch_with};
pub use events::events_from_diff;
pub use ingest::{IngestReport, run_ingest};
