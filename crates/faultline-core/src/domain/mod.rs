//! Domain types for captured errors
//!
//! - [`LogPayload`] - the unit moving through the pipeline
//! - [`Fingerprint`] - deduplication key derived from a payload
//! - [`TelemetryError`] - failures reported by adapters
//! - [`ErrorDocument`] - the collector's bounded error store

pub mod errors;
pub mod payload;
pub mod remote;

pub use errors::TelemetryError;
pub use payload::{Fingerprint, Level, LogPayload, RequestInfo, Source};
pub use remote::{ErrorDocument, ErrorStats};
