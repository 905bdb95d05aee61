//! Local log store
//!
//! Keeps every accepted payload, whether or not it was delivered, in a
//! bounded ordered log. The log lives in memory and is mirrored as a JSON
//! array under a single durable key.
//!
//! The pipeline persists after each delivery attempt rather than after each
//! append. Persistence failures are logged and otherwise ignored: the
//! in-memory log stays authoritative for the rest of the session.
//!
//! Writing goes through a [`LogSnapshot`] so the caller can serialize under
//! its own lock and do the storage I/O elsewhere. Snapshots carry the
//! revision they were taken at; a snapshot older than the last one written is
//! dropped, so out-of-order writers never roll the durable copy back.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use faultline_core::ports::StateStorage;
use faultline_core::{LogPayload, TelemetryError};
use tracing::{debug, warn};

use crate::reentry::Reentry;
use crate::serializer::panic_message;

/// Default number of payloads kept.
pub const DEFAULT_STORE_CAPACITY: usize = 100;

/// Default durable key of the local log.
pub const DEFAULT_STORAGE_KEY: &str = "app-error-logs";

/// Bounded log of captured payloads with durable mirroring
pub struct LocalLogStore {
    entries: VecDeque<LogPayload>,
    capacity: usize,
    storage: Arc<dyn StateStorage>,
    key: String,
    /// Bumped on every change of `entries`
    revision: u64,
    /// Revision of the last snapshot written
    written: Arc<Mutex<u64>>,
}

impl LocalLogStore {
    /// Creates an empty store. Call [`LocalLogStore::load`] to restore
    /// previously persisted entries.
    pub fn new(storage: Arc<dyn StateStorage>, key: impl Into<String>, capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
            storage,
            key: key.into(),
            revision: 0,
            written: Arc::new(Mutex::new(0)),
        }
    }

    /// Restores the persisted log, replacing the in-memory content.
    ///
    /// Missing, unreadable or corrupt state yields an empty store. Returns the
    /// number of entries restored.
    pub fn load(&mut self) -> usize {
        self.entries = match self.read_persisted() {
            Ok(entries) => entries,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Discarding unreadable local log state");
                VecDeque::new()
            }
        };
        self.trim();
        self.revision += 1;
        debug!(key = %self.key, entries = self.entries.len(), "Local log loaded");
        self.entries.len()
    }

    fn read_persisted(&self) -> Result<VecDeque<LogPayload>, TelemetryError> {
        match self.storage.get(&self.key)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(VecDeque::new()),
        }
    }

    /// Adds a payload at the end, dropping the oldest entries beyond capacity.
    pub fn append(&mut self, payload: LogPayload) {
        self.entries.push_back(payload);
        self.trim();
        self.revision += 1;
    }

    fn trim(&mut self) {
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// All entries, oldest first.
    pub fn all(&self) -> Vec<LogPayload> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The whole log as pretty-printed JSON.
    pub fn export_as_text(&self) -> String {
        serde_json::to_string_pretty(&self.entries).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to export local log");
            "[]".to_string()
        })
    }

    /// Empties the log and persists the empty state.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.revision += 1;
        self.persist();
    }

    /// Writes the current log to durable storage. Failures are logged only.
    pub fn persist(&self) {
        if let Err(e) = self.try_persist() {
            warn!(key = %self.key, error = %e, "Failed to persist local log");
        }
    }

    /// Writes the current log to durable storage.
    pub fn try_persist(&self) -> Result<(), TelemetryError> {
        self.snapshot().write()
    }

    /// Serialized copy of the current log, to be written later.
    pub fn snapshot(&self) -> LogSnapshot {
        LogSnapshot {
            storage: Arc::clone(&self.storage),
            key: self.key.clone(),
            revision: self.revision,
            written: Arc::clone(&self.written),
            raw: serde_json::to_string(&self.entries).map_err(TelemetryError::from),
        }
    }
}

/// The local log at one revision, detached from the store
pub struct LogSnapshot {
    storage: Arc<dyn StateStorage>,
    key: String,
    revision: u64,
    written: Arc<Mutex<u64>>,
    raw: Result<String, TelemetryError>,
}

impl LogSnapshot {
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Writes the snapshot unless a newer one was already written.
    ///
    /// Blocking. A panicking storage adapter is reported as
    /// [`TelemetryError::Storage`].
    pub fn write(self) -> Result<(), TelemetryError> {
        let raw = self.raw?;
        let mut written = self.written.lock().unwrap_or_else(|e| e.into_inner());
        if self.revision < *written {
            debug!(key = %self.key, revision = self.revision, "Skipping stale local log snapshot");
            return Ok(());
        }

        let _reentry = Reentry::enter();
        let storage = &self.storage;
        let key = &self.key;
        match catch_unwind(AssertUnwindSafe(|| storage.set(key, &raw))) {
            Ok(Ok(())) => {
                *written = self.revision;
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(payload) => Err(TelemetryError::Storage(format!(
                "storage adapter panicked: {}",
                panic_message(payload.as_ref())
            ))),
        }
    }
}
