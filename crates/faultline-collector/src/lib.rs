//! Faultline Collector - remote log collection endpoint
//!
//! Provides:
//! - `ErrorFileStore`: bounded JSON document of received errors on disk
//! - `CollectorServer`: HTTP API over the store, including the pipeline's
//!   delivery endpoint and CORS for browser clients
//! - `CollectorMetrics`: Prometheus counters served on `/metrics`

pub mod metrics;
pub mod server;
pub mod store;

pub use metrics::CollectorMetrics;
pub use server::{CollectorServer, Route};
pub use store::{ErrorFileStore, StoreError};
