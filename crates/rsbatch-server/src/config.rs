//! Configuration management for the rsbatch server.
//!
//! This module provides configuration loading with multiple sources:
//! 1. Default values (hardcoded)
//! 2. Configuration file (YAML)
//! 3. Environment variables (override)
//!
//! # Configuration Hierarchy
//!
//! Environment variables take precedence over config file values,
//! which take precedence over defaults.
//!
//! # Example
//!
//! ```ignore
//! use rsbatch_server::config::ServerConfig;
//!
//! // Load from file with env overrides
//! let config = ServerConfig::load("config.yaml")?;
//!
//! // Or load from environment only
//! let config = ServerConfig::from_env()?;
//! ```

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

use crate::handlers::batch::{BatchHandlerConfig, DEFAULT_MAX_BATCH_SIZE};

/// Prefix for environment variable overrides.
const ENV_PREFIX: &str = "RSBATCH";

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ServerConfig {
    /// Server settings
    #[serde(default)]
    pub server: ServerSettings,

    /// Batch endpoint settings
    #[serde(default)]
    pub batch: BatchSettings,

    /// Sub-request dispatch settings
    #[serde(default)]
    pub dispatch: DispatchSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Metrics settings
    #[serde(default)]
    pub metrics: MetricsSettings,
}

/// Server network settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ServerSettings {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Batch endpoint settings.
///
/// # Example YAML Configuration
///
/// ```yaml
/// batch:
///   endpoint: /batch
///   max_batch_size: 50
///   body_limit_bytes: 1048576
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct BatchSettings {
    /// Path the batch endpoint is mounted at.
    ///
    /// Environment variable: `RSBATCH_BATCH__ENDPOINT`
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Maximum number of sub-requests per batch.
    ///
    /// Environment variable: `RSBATCH_BATCH__MAX_BATCH_SIZE`
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Maximum size of a batch request body in bytes.
    #[serde(default = "default_body_limit_bytes")]
    pub body_limit_bytes: usize,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            max_batch_size: default_max_batch_size(),
            body_limit_bytes: default_body_limit_bytes(),
        }
    }
}

impl BatchSettings {
    /// Handler limits derived from these settings.
    pub fn handler_config(&self) -> BatchHandlerConfig {
        BatchHandlerConfig {
            max_batch_size: self.max_batch_size,
        }
    }
}

fn default_endpoint() -> String {
    "/batch".to_string()
}

fn default_max_batch_size() -> usize {
    DEFAULT_MAX_BATCH_SIZE
}

fn default_body_limit_bytes() -> usize {
    1024 * 1024
}

/// Where sub-requests are sent.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct DispatchSettings {
    /// Base URL that resolved sub-request paths are joined onto.
    ///
    /// Environment variable: `RSBATCH_DISPATCH__UPSTREAM_URL`
    #[serde(default = "default_upstream_url")]
    pub upstream_url: String,

    /// Per sub-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            upstream_url: default_upstream_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_upstream_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON format for logs
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Metrics settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MetricsSettings {
    /// Expose Prometheus metrics at `/metrics`
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl ServerConfig {
    /// Load configuration from a YAML file with environment variable overrides.
    ///
    /// Environment variables are prefixed with `RSBATCH_` and use `__` as separator.
    /// For example:
    /// - `RSBATCH_SERVER__PORT=9090` overrides `server.port`
    /// - `RSBATCH_DISPATCH__UPSTREAM_URL=...` overrides `dispatch.upstream_url`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigLoadError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let config = Config::builder()
            .add_source(Config::try_from(&ServerConfig::default())?)
            .add_source(File::from(path).format(FileFormat::Yaml))
            .add_source(env_source())
            .build()?;

        let server_config: ServerConfig = config.try_deserialize()?;
        server_config.validate()?;

        Ok(server_config)
    }

    /// Load configuration from environment variables only.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let config = Config::builder()
            .add_source(Config::try_from(&ServerConfig::default())?)
            .add_source(env_source())
            .build()?;

        let server_config: ServerConfig = config.try_deserialize()?;
        server_config.validate()?;

        Ok(server_config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.server.port == 0 {
            return Err(invalid("server.port must be greater than 0"));
        }

        if !self.batch.endpoint.starts_with('/') {
            return Err(invalid(format!(
                "batch.endpoint must start with '/', got: {}",
                self.batch.endpoint
            )));
        }

        if self.batch.max_batch_size == 0 {
            return Err(invalid("batch.max_batch_size must be greater than 0"));
        }

        match Url::parse(&self.dispatch.upstream_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(_) | Err(_) => {
                return Err(invalid(format!(
                    "dispatch.upstream_url must be an http(s) URL, got: {}",
                    self.dispatch.upstream_url
                )));
            }
        }

        if self.dispatch.timeout_secs == 0 {
            return Err(invalid("dispatch.timeout_secs must be greater than 0"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(invalid(format!(
                "logging.level must be one of: {:?}, got: {}",
                valid_levels, self.logging.level
            )));
        }

        Ok(())
    }
}

// Nested keys use `__`: RSBATCH_SERVER__PORT -> server.port
fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

fn invalid(message: impl Into<String>) -> ConfigLoadError {
    ConfigLoadError::Invalid {
        message: message.into(),
    }
}
