//! Durable client-side storage adapters
//!
//! - [`FileStateStorage`] keeps one `<key>.json` file per key in a directory,
//!   typically `~/.local/share/faultline/state/`.
//! - [`MemoryStateStorage`] keeps everything in memory (tests, ephemeral sessions).

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use faultline_core::ports::StateStorage;
use faultline_core::TelemetryError;

/// File-per-key storage rooted at a directory.
pub struct FileStateStorage {
    state_dir: PathBuf,
}

impl FileStateStorage {
    /// Creates a storage rooted at `state_dir`. The directory is created on
    /// the first write.
    pub fn new(state_dir: PathBuf) -> Self {
        Self { state_dir }
    }

    /// Returns the storage directory.
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, TelemetryError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
            && !key.starts_with('.');
        if !valid {
            return Err(TelemetryError::Storage(format!("invalid storage key '{}'", key)));
        }
        Ok(self.state_dir.join(format!("{key}.json")))
    }
}

impl StateStorage for FileStateStorage {
    fn get(&self, key: &str) -> Result<Option<String>, TelemetryError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), TelemetryError> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.state_dir)?;

        // Write then rename so a crash never leaves a half-written slot behind
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), TelemetryError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory storage; contents vanish with the process.
#[derive(Default)]
pub struct MemoryStateStorage {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryStateStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl StateStorage for MemoryStateStorage {
    fn get(&self, key: &str) -> Result<Option<String>, TelemetryError> {
        Ok(self.slots().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), TelemetryError> {
        self.slots().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), TelemetryError> {
        self.slots().remove(key);
        Ok(())
    }
}
