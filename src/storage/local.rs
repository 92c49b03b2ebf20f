// src/storage/local.rs

//! Local filesystem snapshot storage.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! └── snapshots/
//!     └── {topic}.json
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::Catalog;
use crate::storage::SnapshotStore;

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Snapshot key for a university topic.
    fn snapshot_key(topic: &str) -> Result<String> {
        if topic.is_empty() || topic.contains(['/', '\\']) || topic.starts_with('.') {
            return Err(AppError::validation(format!(
                "invalid snapshot topic: {topic:?}"
            )));
        }
        Ok(format!("snapshots/{topic}.json"))
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl SnapshotStore for LocalStorage {
    async fn load_snapshot(&self, topic: &str) -> Result<Option<Catalog>> {
        let key = Self::snapshot_key(topic)?;
        self.read_json(&key).await
    }

    async fn save_snapshot(&self, catalog: &Catalog) -> Result<()> {
        let key = Self::snapshot_key(&catalog.topic)?;
        self.write_json(&key, catalog).await?;
        log::info!(
            "Snapshot {} written ({} subjects, {} sections)",
            key,
            catalog.subjects.len(),
            catalog.section_count()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Subject;
    use tempfile::TempDir;

    fn make_catalog() -> Catalog {
        let mut catalog = Catalog {
            id: 7,
            name: "New Jersey Institute of Technology".into(),
            subjects: vec![Subject {
                id: 1,
                name: "Computer Science".into(),
                ..Subject::default()
            }],
            ..Catalog::default()
        };
        catalog.normalize();
        catalog
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        let catalog = make_catalog();

        storage.save_snapshot(&catalog).await.unwrap();
        let loaded = storage.load_snapshot(&catalog.topic).await.unwrap();
        assert_eq!(loaded, Some(catalog.clone()));
        assert!(dir.path().join(format!("snapshots/{}.json", catalog.topic)).exists());
    }

    #[tokio::test]
    async fn test_read_nonexistent() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        assert!(storage.load_snapshot("NJIT").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_overwrite_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        let mut catalog = make_catalog();
        storage.save_snapshot(&catalog).await.unwrap();
        catalog.subjects.clear();
        storage.save_snapshot(&catalog).await.unwrap();

        let loaded = storage.load_snapshot(&catalog.topic).await.unwrap().unwrap();
        assert!(loaded.subjects.is_empty());
        let tmp = dir.path().join(format!("snapshots/{}.tmp", catalog.topic));
        assert!(!tmp.exists());
    }

    #[tokio::test]
    async fn test_rejects_path_like_topics() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        assert!(storage.load_snapshot("../etc").await.is_err());
        assert!(storage.load_snapshot("").await.is_err());
    }
}
