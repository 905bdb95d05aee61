//! Faultline Telemetry - client-side error capture and delivery
//!
//! Provides:
//! - `serialize`: turns any thrown value into a transmittable error record
//! - `DedupeIndex`: bounded FIFO set of recently seen fingerprints
//! - `DeliveryRateLimiter` / `DeliveryQueue`: minimum spacing between sends, overflow queued
//! - `LocalLogStore`: bounded local log persisted through a `StateStorage`
//! - `TelemetryPipeline`: wires everything together behind `capture`
//! - Capture adapters: panic hook, task watcher, intercepted HTTP client
//! - `AlertBanner`: transient single-slot notification
//! - `HttpTransport` / `CollectorClient`: talking to the remote log collector

pub mod alert;
pub mod capture;
pub mod client;
pub mod dedupe;
pub mod delivery;
pub mod pipeline;
mod reentry;
pub mod serializer;
pub mod state;
pub mod store;
pub mod transport;

pub use alert::AlertBanner;
pub use capture::{install_panic_capture, watch_task, HttpFailure, InterceptedClient};
pub use client::CollectorClient;
pub use dedupe::DedupeIndex;
pub use delivery::{DeliveryOutcome, DeliveryQueue, DeliveryRateLimiter};
pub use pipeline::{CaptureExtra, PipelineStats, TelemetryPipeline};
pub use serializer::{serialize, serialize_with_message, OwnProperties, Thrown};
pub use state::{FileStateStorage, MemoryStateStorage};
pub use store::{LocalLogStore, LogSnapshot};
pub use transport::HttpTransport;
