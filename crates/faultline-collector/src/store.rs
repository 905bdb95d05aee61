//! Bounded JSON error store
//!
//! The whole store is one pretty-printed [`ErrorDocument`] on disk. Every
//! mutation is a read-modify-write of that file, serialized behind an async
//! mutex so concurrent requests never lose each other's records.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use faultline_core::ErrorDocument;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Failures while writing the store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode error document: {0}")]
    Encode(#[from] serde_json::Error),
}

/// File-backed store keeping the `max_errors` most recent records
pub struct ErrorFileStore {
    path: PathBuf,
    max_errors: usize,
    write_lock: Mutex<()>,
}

impl ErrorFileStore {
    pub fn new(path: PathBuf, max_errors: usize) -> Self {
        Self {
            path,
            max_errors: max_errors.max(1),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_errors(&self) -> usize {
        self.max_errors
    }

    /// Current document. A missing or unreadable file reads as empty.
    pub async fn read(&self) -> ErrorDocument {
        let _guard = self.write_lock.lock().await;
        self.read_unlocked().await
    }

    async fn read_unlocked(&self) -> ErrorDocument {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(path = %self.path.display(), error = %e, "Error store is corrupt, treating as empty");
                ErrorDocument::default()
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => ErrorDocument::default(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read error store, treating as empty");
                ErrorDocument::default()
            }
        }
    }

    /// Appends `records` in order, evicting the oldest beyond capacity.
    pub async fn append(&self, records: Vec<Value>) -> Result<ErrorDocument, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.read_unlocked().await;
        let added = records.len();
        document.append_bounded(records, self.max_errors);
        document.last_updated = Some(Utc::now().to_rfc3339());
        document.total_errors = document.errors.len();
        self.write_unlocked(&document).await?;
        debug!(added, total = document.total_errors, "Errors appended");
        Ok(document)
    }

    /// Removes every record and resets `lastUpdated`.
    pub async fn clear(&self) -> Result<ErrorDocument, StoreError> {
        let _guard = self.write_lock.lock().await;
        let document = ErrorDocument::default();
        self.write_unlocked(&document).await?;
        debug!("Error store cleared");
        Ok(document)
    }

    async fn write_unlocked(&self, document: &ErrorDocument) -> Result<(), StoreError> {
        let raw = serde_json::to_string_pretty(document)?;
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, raw).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)?;
        Ok(())
    }
}
