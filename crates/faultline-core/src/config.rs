//! Configuration module for Faultline.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for Faultline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub collector: CollectorConfig,
    pub alert: AlertConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Capture pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of recent fingerprints remembered for deduplication.
    pub dedupe_capacity: usize,
    /// Number of payloads kept in the local log store.
    pub store_capacity: usize,
    /// Minimum spacing between two deliveries, in milliseconds.
    pub rate_limit_ms: u64,
    /// Upper bound of a single delivery, in milliseconds.
    pub timeout_ms: u64,
    /// Name of the durable slot holding the local log.
    pub storage_key: String,
    /// Directory backing the durable client-side storage.
    pub state_dir: PathBuf,
    /// Agent string attached to payloads, if any.
    pub user_agent: Option<String>,
}

/// Remote log collector endpoints, as seen by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Scheme, host and port of the collector.
    pub base_url: String,
    /// Path receiving one `LogPayload` per request.
    pub logs_path: String,
    /// Path of the bounded error store.
    pub errors_path: String,
}

/// Transient alert banner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Delay before a shown message is cleared, in milliseconds.
    pub clear_delay_ms: u64,
}

/// Collector server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind, e.g. `127.0.0.1:3000`.
    pub listen: String,
    /// JSON file holding the received errors.
    pub errors_file: PathBuf,
    /// Number of errors retained; older ones are evicted first.
    pub max_errors: usize,
    /// Whether `/metrics` is served.
    pub metrics_enabled: bool,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/faultline/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("faultline")
            .join("config.yaml")
    }

    /// Serialize the configuration back to YAML.
    pub fn to_yaml(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

impl PipelineConfig {
    pub fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl CollectorConfig {
    /// Full URL of the log delivery endpoint.
    pub fn logs_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.logs_path)
    }

    /// Full URL of the error store endpoint.
    pub fn errors_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.errors_path)
    }
}

impl AlertConfig {
    pub fn clear_delay(&self) -> Duration {
        Duration::from_millis(self.clear_delay_ms)
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("faultline")
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dedupe_capacity: 100,
            store_capacity: 100,
            rate_limit_ms: 1000,
            timeout_ms: 5000,
            storage_key: "app-error-logs".to_string(),
            state_dir: data_dir().join("state"),
            user_agent: None,
        }
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            logs_path: "/api/logs".to_string(),
            errors_path: "/api/errors".to_string(),
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            clear_delay_ms: 5000,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:3000".to_string(),
            errors_file: data_dir().join("errors.json"),
            max_errors: 100,
            metrics_enabled: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"pipeline.rate_limit_ms"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- pipeline ---
        if self.pipeline.dedupe_capacity == 0 {
            errors.push(ValidationError::new(
                "pipeline.dedupe_capacity",
                "must be greater than 0",
            ));
        }
        if self.pipeline.store_capacity == 0 {
            errors.push(ValidationError::new(
                "pipeline.store_capacity",
                "must be greater than 0",
            ));
        }
        if self.pipeline.rate_limit_ms == 0 {
            errors.push(ValidationError::new(
                "pipeline.rate_limit_ms",
                "must be greater than 0",
            ));
        }
        if self.pipeline.timeout_ms == 0 {
            errors.push(ValidationError::new(
                "pipeline.timeout_ms",
                "must be greater than 0",
            ));
        }
        if self.pipeline.storage_key.trim().is_empty() {
            errors.push(ValidationError::new(
                "pipeline.storage_key",
                "must not be empty",
            ));
        }

        // --- collector ---
        if !self.collector.base_url.starts_with("http://")
            && !self.collector.base_url.starts_with("https://")
        {
            errors.push(ValidationError::new(
                "collector.base_url",
                format!(
                    "must start with http:// or https://, got '{}'",
                    self.collector.base_url
                ),
            ));
        }
        for (field, value) in [
            ("collector.logs_path", &self.collector.logs_path),
            ("collector.errors_path", &self.collector.errors_path),
        ] {
            if !value.starts_with('/') {
                errors.push(ValidationError::new(
                    field,
                    format!("must start with '/', got '{}'", value),
                ));
            }
        }

        // --- alert ---
        if self.alert.clear_delay_ms == 0 {
            errors.push(ValidationError::new(
                "alert.clear_delay_ms",
                "must be greater than 0",
            ));
        }

        // --- server ---
        if self.server.listen.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::new(
                "server.listen",
                format!("not a socket address: '{}'", self.server.listen),
            ));
        }
        if self.server.max_errors == 0 {
            errors.push(ValidationError::new(
                "server.max_errors",
                "must be greater than 0",
            ));
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError::new(
                "logging.level",
                format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            ));
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use faultline_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .pipeline_rate_limit_ms(250)
///     .collector_base_url("http://127.0.0.1:8080")
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // -- pipeline --

    pub fn pipeline_dedupe_capacity(mut self, n: usize) -> Self {
        self.config.pipeline.dedupe_capacity = n;
        self
    }

    pub fn pipeline_store_capacity(mut self, n: usize) -> Self {
        self.config.pipeline.store_capacity = n;
        self
    }

    pub fn pipeline_rate_limit_ms(mut self, ms: u64) -> Self {
        self.config.pipeline.rate_limit_ms = ms;
        self
    }

    pub fn pipeline_timeout_ms(mut self, ms: u64) -> Self {
        self.config.pipeline.timeout_ms = ms;
        self
    }

    pub fn pipeline_storage_key(mut self, key: impl Into<String>) -> Self {
        self.config.pipeline.storage_key = key.into();
        self
    }

    pub fn pipeline_state_dir(mut self, dir: PathBuf) -> Self {
        self.config.pipeline.state_dir = dir;
        self
    }

    pub fn pipeline_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.pipeline.user_agent = Some(agent.into());
        self
    }

    // -- collector --

    pub fn collector_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.collector.base_url = url.into();
        self
    }

    pub fn collector_logs_path(mut self, path: impl Into<String>) -> Self {
        self.config.collector.logs_path = path.into();
        self
    }

    pub fn collector_errors_path(mut self, path: impl Into<String>) -> Self {
        self.config.collector.errors_path = path.into();
        self
    }

    // -- alert --

    pub fn alert_clear_delay_ms(mut self, ms: u64) -> Self {
        self.config.alert.clear_delay_ms = ms;
        self
    }

    // -- server --

    pub fn server_listen(mut self, addr: impl Into<String>) -> Self {
        self.config.server.listen = addr.into();
        self
    }

    pub fn server_errors_file(mut self, path: PathBuf) -> Self {
        self.config.server.errors_file = path;
        self
    }

    pub fn server_max_errors(mut self, n: usize) -> Self {
        self.config.server.max_errors = n;
        self
    }

    pub fn server_metrics_enabled(mut self, enabled: bool) -> Self {
        self.config.server.metrics_enabled = enabled;
        self
    }

    // -- logging --

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// Consume the builder and return the [`Config`] (no validation).
    pub fn build(self) -> Config {
        self.config
    }

    /// Consume the builder, validate, and return the [`Config`] or errors.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let errors = self.config.validate();
        if errors.is_empty() {
            Ok(self.config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
