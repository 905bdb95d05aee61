//! Log payload model
//!
//! A [`LogPayload`] is built once per capture and then flows unchanged through
//! deduplication, the local store and the delivery queue. Its JSON shape is the
//! wire format accepted by the collector's `POST /api/logs`.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Level
// ============================================================================

/// Severity of a captured event
///
/// Only `Error` is produced by the built-in capture points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Error,
    Warn,
    Info,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::Error => "error",
            Level::Warn => "warn",
            Level::Info => "info",
        };
        write!(f, "{}", s)
    }
}

// ============================================================================
// Source
// ============================================================================

/// Capture point that produced a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    /// Uncaught synchronous error
    #[serde(rename = "frontend")]
    Frontend,
    /// Failed outbound HTTP request
    #[serde(rename = "http")]
    Http,
    /// Unhandled asynchronous failure
    #[serde(rename = "unhandledrejection")]
    UnhandledRejection,
    /// The telemetry pipeline itself; never re-logged
    #[serde(rename = "logging-service")]
    LoggingService,
}

impl Source {
    /// Wire name of the source, as used in payloads and fingerprints.
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Frontend => "frontend",
            Source::Http => "http",
            Source::UnhandledRejection => "unhandledrejection",
            Source::LoggingService => "logging-service",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "frontend" => Ok(Source::Frontend),
            "http" => Ok(Source::Http),
            "unhandledrejection" => Ok(Source::UnhandledRejection),
            "logging-service" => Ok(Source::LoggingService),
            other => Err(format!(
                "unknown source '{}'; valid options: frontend, http, unhandledrejection, logging-service",
                other
            )),
        }
    }
}

// ============================================================================
// RequestInfo
// ============================================================================

/// The outbound request that failed, attached to `http` payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestInfo {
    pub url: String,
    pub method: String,
}

impl RequestInfo {
    pub fn new(url: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
        }
    }
}

// ============================================================================
// LogPayload
// ============================================================================

/// A captured event, ready to be stored and delivered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogPayload {
    pub level: Level,
    pub source: Source,
    /// Human-readable description; may be empty
    #[serde(default)]
    pub message: String,
    /// Serialized error record, or `null`
    #[serde(default)]
    pub error: Option<Value>,
    /// Present only for `http` payloads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestInfo>,
    /// RFC 3339 capture timestamp
    pub time: String,
    /// Location of the host application when the event happened
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Agent string of the host application
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl LogPayload {
    /// Creates a payload stamped with the current time.
    pub fn new(level: Level, source: Source, message: impl Into<String>) -> Self {
        Self {
            level,
            source,
            message: message.into(),
            error: None,
            request: None,
            time: Utc::now().to_rfc3339(),
            url: None,
            user_agent: None,
        }
    }

    /// Shorthand for an `error`-level payload.
    pub fn error(source: Source, message: impl Into<String>) -> Self {
        Self::new(Level::Error, source, message)
    }

    pub fn with_error(mut self, error: Option<Value>) -> Self {
        self.error = error;
        self
    }

    pub fn with_request(mut self, request: RequestInfo) -> Self {
        self.request = Some(request);
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Deduplication key of this payload.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(self)
    }

    /// Whether this payload was emitted by the telemetry pipeline itself.
    pub fn is_self_generated(&self) -> bool {
        self.source == Source::LoggingService
    }
}

// ============================================================================
// Fingerprint
// ============================================================================

/// Deduplication key: `source-message-url`
///
/// Distinct errors sharing source, message and request URL collapse into the
/// same fingerprint. That loss is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Derives the fingerprint of a payload. A missing request URL yields an
    /// empty last segment.
    pub fn of(payload: &LogPayload) -> Self {
        let url = payload
            .request
            .as_ref()
            .map(|r| r.url.as_str())
            .unwrap_or("");
        Self(format!("{}-{}-{}", payload.source, payload.message, url))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Fingerprint {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
