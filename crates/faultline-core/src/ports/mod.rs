//! Port definitions (driven/secondary ports)
//!
//! The pipeline talks to the outside world through two traits:
//! - [`LogTransport`] - delivers one payload to the remote log collector
//! - [`StateStorage`] - durable client-side key/value storage for the local log

pub mod state_storage;
pub mod transport;

pub use state_storage::StateStorage;
pub use transport::LogTransport;
