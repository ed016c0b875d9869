//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::client::RemoteClientConfig;
use crate::session::IdentityConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Which backend to talk to
    #[serde(default)]
    pub mode: Mode,

    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub subscription: SubscriptionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Hosted identity provider and data service
    #[default]
    Remote,
    /// In-process service; nothing leaves the machine
    Local,
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "remote" => Ok(Mode::Remote),
            "local" => Ok(Mode::Local),
            other => Err(ConfigError::Invalid(format!("unknown mode '{}'", other))),
        }
    }
}

/// Hosted data service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_service_url")]
    pub url: String,

    #[serde(default = "default_collection")]
    pub collection: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_service_url() -> String {
    "http://localhost:8090".to_string()
}

fn default_collection() -> String {
    "Expense".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            url: default_service_url(),
            collection: default_collection(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Identity provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_auth_url")]
    pub url: String,

    /// Username to pre-fill at the sign-in prompt
    pub username: Option<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_auth_url() -> String {
    "http://localhost:8090/auth".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            url: default_auth_url(),
            username: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Live query configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionConfig {
    #[serde(default = "default_reconnect_attempts")]
    pub reconnect_attempts: u32,

    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,

    #[serde(default = "default_ping_interval")]
    pub ping_interval_secs: u64,
}

fn default_reconnect_attempts() -> u32 {
    5
}

fn default_max_backoff() -> u64 {
    30_000 // 30 seconds
}

fn default_ping_interval() -> u64 {
    30
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            reconnect_attempts: default_reconnect_attempts(),
            max_backoff_ms: default_max_backoff(),
            ping_interval_secs: default_ping_interval(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("expense-tracker").join("config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply `EXPENSES_*` overrides from a variable lookup
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(mode) = lookup("EXPENSES_MODE") {
            match mode.parse() {
                Ok(mode) => self.mode = mode,
                Err(e) => tracing::warn!("Ignoring EXPENSES_MODE: {}", e),
            }
        }

        // Data service overrides
        if let Some(url) = lookup("EXPENSES_SERVICE_URL") {
            self.service.url = url;
        }
        if let Some(collection) = lookup("EXPENSES_COLLECTION") {
            self.service.collection = collection;
        }

        // Identity provider overrides
        if let Some(url) = lookup("EXPENSES_AUTH_URL") {
            self.auth.url = url;
        }
        if let Some(username) = lookup("EXPENSES_USERNAME") {
            self.auth.username = Some(username);
        }

        // Logging overrides
        if let Some(level) = lookup("EXPENSES_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("EXPENSES_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Settings for the hosted data service client
    pub fn remote_client_config(&self) -> RemoteClientConfig {
        RemoteClientConfig {
            base_url: self.service.url.clone(),
            collection: self.service.collection.clone(),
            request_timeout_ms: self.service.request_timeout_secs * 1000,
            reconnect_attempts: self.subscription.reconnect_attempts,
            max_backoff_ms: self.subscription.max_backoff_ms,
            ping_interval_secs: self.subscription.ping_interval_secs,
        }
    }

    /// Settings for the hosted identity provider
    pub fn identity_config(&self) -> IdentityConfig {
        IdentityConfig {
            base_url: self.auth.url.clone(),
            request_timeout_ms: self.auth.request_timeout_secs * 1000,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Expense Tracker Configuration
#
# Environment variables override these settings:
# - EXPENSES_MODE
# - EXPENSES_SERVICE_URL
# - EXPENSES_COLLECTION
# - EXPENSES_AUTH_URL
# - EXPENSES_USERNAME
# - EXPENSES_LOG_LEVEL
# - EXPENSES_LOG_FORMAT

# Backend: "remote" (hosted services) or "local" (in-process, offline)
mode = "remote"

[service]
# Data service base URL; the live query uses the matching ws:// or wss:// URL
url = "http://localhost:8090"

# Collection holding the expenses
collection = "Expense"

# Request timeout in seconds
request_timeout_secs = 10

[auth]
# Identity provider base URL
url = "http://localhost:8090/auth"

# Username to pre-fill at the sign-in prompt
# username = "alice"

# Request timeout in seconds
request_timeout_secs = 10

[subscription]
# Reconnect attempts before the live query gives up
reconnect_attempts = 5

# Upper bound on the reconnect delay (ms)
max_backoff_ms = 30000

# Keepalive ping interval in seconds
ping_interval_secs = 30

[logging]
# Log level: trace, debug, info, warn, error
level = "warn"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
