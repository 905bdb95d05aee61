//! Faultline Core - data model and contracts of the error telemetry pipeline
//!
//! This crate contains:
//! - **Domain types** - `LogPayload`, `Level`, `Source`, `RequestInfo`, `Fingerprint`
//! - **Errors** - `TelemetryError`, shared by every adapter
//! - **Ports** - `LogTransport` (outbound delivery) and `StateStorage` (durable client state)
//! - **Configuration** - YAML-backed `Config` with validation and a builder
//!
//! Nothing here performs I/O on its own except configuration loading; the
//! telemetry and collector crates supply the adapters.

pub mod config;
pub mod domain;
pub mod ports;

pub use domain::{
    ErrorDocument, ErrorStats, Fingerprint, Level, LogPayload, RequestInfo, Source, TelemetryError,
};
