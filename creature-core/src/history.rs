//! The saved-creature gallery.
//!
//! History is a newest-first list of [`HistoryRecord`]s persisted as a single
//! JSON array. Every mutation writes the whole list back immediately. A
//! missing or unreadable file loads as an empty gallery.

use crate::creature::HistoryRecord;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

/// File name of the history entry inside the data directory.
pub const HISTORY_FILE: &str = "creature_history.json";

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Append/remove-only gallery of generated creatures.
#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    path: Option<PathBuf>,
    records: Vec<HistoryRecord>,
}

impl HistoryStore {
    /// A store that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the gallery stored at `path`. Never fails: corrupt or missing
    /// data yields an empty gallery.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = match fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str::<Vec<HistoryRecord>>(&content) {
                Ok(records) => records,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "history is corrupt, starting empty");
                    Vec::new()
                }
            },
            Err(e) => {
                debug!(path = %path.display(), error = %e, "no saved history");
                Vec::new()
            }
        };

        Self {
            path: Some(path),
            records,
        }
    }

    /// Load the gallery from its default file inside `data_dir`.
    pub async fn load_from_dir(data_dir: impl AsRef<Path>) -> Self {
        Self::load(data_dir.as_ref().join(HISTORY_FILE)).await
    }

    /// Where the gallery is persisted, if anywhere.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// All records, newest first.
    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&HistoryRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Newest record whose creature carries `name`.
    pub fn find_by_name(&self, name: &str) -> Option<&HistoryRecord> {
        self.records.iter().find(|r| r.data.name == name)
    }

    /// Names of every saved creature, newest first.
    pub fn available_forms(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.data.name.as_str()).collect()
    }

    /// Insert at the front and persist.
    pub async fn append(&mut self, record: HistoryRecord) -> Result<(), HistoryError> {
        debug!(id = %record.id, name = %record.data.name, "appending history record");
        self.records.insert(0, record);
        self.persist().await
    }

    /// Remove the record with `id` and persist. Unknown ids are a no-op.
    /// Returns whether a record was removed.
    pub async fn remove(&mut self, id: &str) -> Result<bool, HistoryError> {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        let removed = self.records.len() != before;
        self.persist().await?;
        Ok(removed)
    }

    /// Write the whole gallery to storage.
    pub async fn persist(&self) -> Result<(), HistoryError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string(&self.records)?;
        fs::write(path, content).await?;
        Ok(())
    }
}
