//! File-backed change-detection store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

use super::{DiffStore, RecordKey};
use crate::{Error, Result};

/// On-disk record layout
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRecord {
    stored_at: DateTime<Utc>,
    payload: serde_json::Value,
}

/// Stores one JSON file per record key under a root directory
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    tmp_counter: AtomicU64,
}

impl FileStore {
    /// Open the store, creating the root directory if needed
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            Error::StorageError(format!("Failed to create {}: {}", root.display(), e))
        })?;
        Ok(Self {
            root,
            tmp_counter: AtomicU64::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Delete every record whose key is not in `live`, plus leftover temp files
    ///
    /// Must not run concurrently with `store`. Returns the number of files removed.
    pub async fn retain(&self, live: &HashSet<RecordKey>) -> Result<usize> {
        let mut entries = tokio::fs::read_dir(&self.root).await.map_err(|e| {
            Error::StorageError(format!("Failed to list {}: {}", self.root.display(), e))
        })?;

        let mut removed = 0;
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    return Err(Error::StorageError(format!(
                        "Failed to list {}: {}",
                        self.root.display(),
                        e
                    )))
                }
            };

            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            let stale = if file_name.ends_with(".tmp") {
                true
            } else if let Some(key) = file_name.strip_suffix(".json") {
                !live.contains(&RecordKey(key.to_string()))
            } else {
                false
            };

            if stale {
                match tokio::fs::remove_file(entry.path()).await {
                    Ok(()) => removed += 1,
                    Err(e) => warn!("Failed to remove stale {}: {}", entry.path().display(), e),
                }
            }
        }

        if removed > 0 {
            info!("Removed {} stale change-detection files", removed);
        }
        Ok(removed)
    }

    fn path_for(&self, key: &RecordKey) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }

    fn tmp_path_for(&self, key: &RecordKey) -> PathBuf {
        let n = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        self.root
            .join(format!(".{}.{}.{}.tmp", key, std::process::id(), n))
    }
}

#[async_trait]
impl DiffStore for FileStore {
    async fn store(&self, key: &RecordKey, payload: &serde_json::Value) -> Result<()> {
        let path = self.path_for(key);
        let record = StoredRecord {
            stored_at: Utc::now(),
            payload: payload.clone(),
        };
        let bytes = serde_json::to_vec(&record)
            .map_err(|e| Error::StorageError(format!("Failed to encode record {}: {}", key, e)))?;

        // Write aside and rename so readers never observe a partial record
        let tmp = self.tmp_path_for(key);
        if let Err(e) = tokio::fs::write(&tmp, &bytes).await {
            return Err(Error::StorageError(format!(
                "Failed to write {}: {}",
                tmp.display(),
                e
            )));
        }
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(Error::StorageError(format!(
                "Failed to store {}: {}",
                path.display(),
                e
            )));
        }

        debug!("Stored diff in {}", path.display());
        Ok(())
    }

    async fn fetch(&self, key: &RecordKey) -> Option<serde_json::Value> {
        let path = self.path_for(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Failed to fetch diff from {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_slice::<StoredRecord>(&bytes) {
            Ok(record) => {
                debug!("Fetched diff from {}", path.display());
                Some(record.payload)
            }
            Err(e) => {
                warn!("Ignoring unreadable diff in {}: {}", path.display(), e);
                None
            }
        }
    }

    async fn purge(&self, key: &RecordKey) {
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!("Purged diff from {}", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to purge diff from {}: {}", path.display(), e),
        }
    }
}
