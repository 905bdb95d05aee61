//! Remote error store documents
//!
//! Shapes exchanged with the collector's `/api/errors` endpoints. The
//! collector owns the state; clients only read it or append to it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Content of the collector's bounded error store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDocument {
    /// Stored records, oldest first
    #[serde(default)]
    pub errors: Vec<Value>,
    /// Time of the last write, `None` after a reset
    #[serde(default)]
    pub last_updated: Option<String>,
    /// Number of records currently held
    #[serde(default)]
    pub total_errors: usize,
}

impl ErrorDocument {
    /// Appends `items` in order and keeps only the `max` most recent records.
    pub fn append_bounded(&mut self, items: impl IntoIterator<Item = Value>, max: usize) {
        self.errors.extend(items);
        if self.errors.len() > max {
            let excess = self.errors.len() - max;
            self.errors.drain(..excess);
        }
        self.total_errors = self.errors.len();
    }
}

/// Summary of the remote store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorStats {
    pub total: usize,
    pub last_updated: String,
}

impl ErrorStats {
    /// Placeholder used when the collector cannot be reached.
    pub fn unknown() -> Self {
        Self {
            total: 0,
            last_updated: "Unknown".to_string(),
        }
    }
}
