//! Durable client-side storage port
//!
//! A tiny string key/value contract. The local log store keeps its whole
//! content under a single key as a JSON array.

use crate::domain::TelemetryError;

/// Named durable slots surviving a process restart
pub trait StateStorage: Send + Sync {
    /// Reads the value stored under `key`, `None` when nothing was written.
    fn get(&self, key: &str) -> Result<Option<String>, TelemetryError>;

    /// Replaces the value stored under `key`.
    fn set(&self, key: &str, value: &str) -> Result<(), TelemetryError>;

    /// Removes `key`; removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), TelemetryError>;
}
