// src/pipeline/ingest.rs

//! Snapshot ingestion: diff against the stored snapshot, extract change
//! events, then replace the stored snapshot.

use serde::Serialize;

use crate::error::Result;
use crate::models::{Catalog, ChangeEvent};
use crate::pipeline::diff::{DiffSummary, diff};
use crate::pipeline::events::events_from_diff;
use crate::storage::SnapshotStore;
use crate::utils::log;

/// Result of one ingestion run.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub topic: String,
    /// Whether a previous snapshot existed
    pub had_previous: bool,
    pub changed: DiffSummary,
    pub events: Vec<ChangeEvent>,
}

/// Ingest a freshly scraped snapshot.
///
/// The snapshot is normalized first. A university seen for the first time
/// is diffed against an empty catalog, so every section is reported.
pub async fn run_ingest(storage: &dyn SnapshotStore, mut snapshot: Catalog) -> Result<IngestReport> {
    snapshot.normalize();
    log::header(&format!("Ingesting snapshot for {}", snapshot.topic));

    let previous = storage.load_snapshot(&snapshot.topic).await?;
    let had_previous = previous.is_some();
    let previous = previous.unwrap_or_default();

    let filtered = diff(&previous, &snapshot);
    let changed = DiffSummary::of(&filtered);
    let events = events_from_diff(&filtered);

    storage.save_snapshot(&snapshot).await?;

    log::summary(
        "Ingest",
        &[
            ("University", snapshot.topic.clone()),
            ("Previous snapshot", had_previous.to_string()),
            ("Changed subjects", changed.subjects.to_string()),
            ("Changed courses", changed.courses.to_string()),
            ("Changed sections", changed.sections.to_string()),
            ("Events", events.len().to_string()),
        ],
    );

    Ok(IngestReport {
        topic: snapshot.topic,
        had_previous,
        changed,
        events,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Course, Section, Subject};
    use crate::storage::LocalStorage;
    use tempfile::TempDir;

    fn make_snapshot(status: &str) -> Catalog {
        Catalog {
            id: 1,
            name: "NJIT".into(),
            // Deliberately out of order; ingestion sorts by id.
            subjects: vec![
                Subject {
                    id: 20,
                    number: "MATH".into(),
                    ..Subject::default()
                },
                Subject {
                    id: 10,
                    number: "CS".into(),
                    courses: vec![Course {
                        id: 100,
                        number: "101".into(),
                        sections: vec![Section {
                            id: 1000,
                            number: "01".into(),
                            status: status.into(),
                            ..Section::default()
                        }],
                        ..Course::default()
                    }],
                    ..Subject::default()
                },
            ],
            ..Catalog::default()
        }
    }

    #[tokio::test]
    async fn test_first_ingest_reports_everything() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());

        let report = run_ingest(&storage, make_snapshot("OPEN")).await.unwrap();
        assert!(!report.had_previous);
        assert_eq!(report.changed.subjects, 2);
        assert_eq!(report.events.len(), 1);
        assert!(storage.load_snapshot("NJIT").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_reingest_reports_only_changes() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        run_ingest(&storage, make_snapshot("OPEN")).await.unwrap();

        let unchanged = run_ingest(&storage, make_snapshot("OPEN")).await.unwrap();
        assert!(unchanged.had_previous);
        assert!(!unchanged.changed.has_changes());
        assert!(unchanged.events.is_empty());

        let closed = run_ingest(&storage, make_snapshot("CLOSED")).await.unwrap();
        assert_eq!(closed.changed, DiffSummary {
            subjects: 1,
            courses: 1,
            sections: 1
        });
        assert_eq!(closed.events.len(), 1);
        assert_eq!(closed.events[0].status, "CLOSED");
        assert_eq!(closed.events[0].topic, "NJIT.CS.101.01");
    }

    #[tokio::test]
    async fn test_non_ascii_university_is_stored_under_its_name() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        let mut snapshot = make_snapshot("OPEN");
        snapshot.name = "연세대학교".into();

        let report = run_ingest(&storage, snapshot).await.unwrap();
        assert_eq!(report.topic, "연세대학교");
        assert_eq!(report.events[0].topic, "연세대학교.CS.101.01");
        assert!(storage.load_snapshot("연세대학교").await.unwrap().is_some());
    }
}
