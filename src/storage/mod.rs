// src/storage/mod.rs

//! Storage abstractions for catalog snapshots and the delivery audit trail.
//!
//! ## Directory Structure
//!
//! ```text
//! storage/
//! └── snapshots/            # Latest snapshot per university topic
//!     ├── NJIT.json
//!     └── Rutgers_University_New_Br.json
//! ```

pub mod audit;
pub mod local;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Catalog;

// Re-export for convenience
pub use audit::{AuditEntry, AuditOutcome, AuditSink, FileAuditSink, LogAuditSink, MemoryAuditSink};
pub use local::LocalStorage;

/// Trait for snapshot storage backends.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load the last stored snapshot for a university topic.
    async fn load_snapshot(&self, topic: &str) -> Result<Option<Catalog>>;

    /// Replace the stored snapshot for the catalog's topic.
    async fn save_snapshot(&self, catalog: &Catalog) -> Result<()>;
}
