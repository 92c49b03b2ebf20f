// src/storage/audit.rs

//! Best-effort audit trail of delivery outcomes.
//!
//! Recording never blocks a delivery task. Sinks may drop entries when they
//! cannot keep up; callers ignore the returned error beyond logging it.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{AppError, Result};
use crate::models::{ChangeEvent, MessageId};

/// Terminal outcome of one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Delivered,
    Rejected,
    Exhausted,
    Failed,
}

/// One audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub topic: String,
    pub dry_run: bool,
    pub outcome: AuditOutcome,
    pub attempts: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Section status carried by the event
    #[serde(default)]
    pub status: String,

    /// Seats taken in the changed section, when the payload has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub now: Option<u32>,
}

impl AuditEntry {
    pub fn for_event(event: &ChangeEvent, dry_run: bool, outcome: AuditOutcome, attempts: u32) -> Self {
        Self {
            timestamp: Utc::now(),
            topic: event.topic.clone(),
            dry_run,
            outcome,
            attempts,
            message_id: None,
            error: None,
            status: event.status.clone(),
            now: event.section().map(|path| path.section.now),
        }
    }

    pub fn with_message_id(mut self, message_id: Option<&MessageId>) -> Self {
        self.message_id = message_id.map(ToString::to_string);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Destination for audit entries.
///
/// Implementations must tolerate concurrent, unordered calls.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: AuditEntry) -> Result<()>;
}

/// Writes entries through the `log` facade under the `audit` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAuditSink;

impl AuditSink for LogAuditSink {
    fn record(&self, entry: AuditEntry) -> Result<()> {
        log::info!(
            target: "audit",
            "{:?} topic={} dry_run={} attempts={} message_id={} status={}{}",
            entry.outcome,
            entry.topic,
            entry.dry_run,
            entry.attempts,
            entry.message_id.as_deref().unwrap_or("-"),
            entry.status,
            entry
                .error
                .as_deref()
                .map(|e| format!(" error={e}"))
                .unwrap_or_default()
        );
        Ok(())
    }
}

/// Keeps entries in memory for inspection.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, entry: AuditEntry) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
        Ok(())
    }
}

/// Appends entries as JSON lines from a background writer task.
///
/// Entries go through a bounded channel; once it is full new entries are
/// rejected rather than waited on.
#[derive(Debug)]
pub struct FileAuditSink {
    tx: mpsc::Sender<AuditEntry>,
    writer: JoinHandle<()>,
    path: PathBuf,
}

impl FileAuditSink {
    /// Open (or create) the audit file and start the writer.
    pub async fn open(path: impl AsRef<Path>, capacity: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        let (tx, rx) = mpsc::channel(capacity.max(1));
        let writer = tokio::spawn(write_entries(file, rx, path.clone()));
        Ok(Self { tx, writer, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stop accepting entries and wait until the queued ones are written.
    pub async fn close(self) {
        drop(self.tx);
        if let Err(e) = self.writer.await {
            log::warn!("Audit writer for {:?} ended abnormally: {}", self.path, e);
        }
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, entry: AuditEntry) -> Result<()> {
        self.tx.try_send(entry).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => AppError::audit("audit queue full, entry dropped"),
            mpsc::error::TrySendError::Closed(_) => AppError::audit("audit writer stopped"),
        })
    }
}

async fn write_entries(mut file: tokio::fs::File, mut rx: mpsc::Receiver<AuditEntry>, path: PathBuf) {
    while let Some(entry) = rx.recv().await {
        let mut line = match serde_json::to_vec(&entry) {
            Ok(line) => line,
            Err(e) => {
                log::warn!("Audit entry for {} not serializable: {}", entry.topic, e);
                continue;
            }
        };
        line.push(b'\n');
        if let Err(e) = file.write_all(&line).await {
            log::warn!("Audit write to {:?} failed: {}", path, e);
        }
    }
    if let Err(e) = file.flush().await {
        log::warn!("Audit flush of {:?} failed: {}", path, e);
    }
}
