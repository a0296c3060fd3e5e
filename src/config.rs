use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use syncsockets::{ExponentialBackoff, SyncClient};
use thiserror::Error;
use tracing::info;

/// Environment variable holding the connection token
pub const TOKEN_ENV_VAR: &str = "SYNC_TOKEN";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarMissing(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Deployment the client talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

/// Server endpoints per environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    pub development: String,
    pub production: String,
}

/// Sync listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub environment: Environment,
    pub endpoints: EndpointsConfig,
    /// Identity sent as `userId` on connect
    pub user_id: String,
    /// Channels subscribed at startup
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    /// Base of the exponential reconnection backoff
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Keepalive ping interval; no pings when absent
    #[serde(default)]
    pub heartbeat_secs: Option<u64>,
    /// Outbound queue cap; unbounded when absent
    #[serde(default)]
    pub max_queued_messages: Option<usize>,
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Connection token from .env (not in YAML)
    #[serde(skip)]
    pub token: Option<String>,
}

fn default_max_reconnect_attempts() -> u32 {
    syncsockets::config::DEFAULT_MAX_RECONNECT_ATTEMPTS
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl SyncConfig {
    /// Load configuration from YAML file and .env
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        let yaml_content = std::fs::read_to_string(config_path)?;

        dotenv::dotenv().ok(); // Don't fail if .env doesn't exist
        let token = std::env::var(TOKEN_ENV_VAR).ok();

        Self::from_yaml(&yaml_content, token)
    }

    /// Parse and validate a YAML document, attaching `token`
    pub fn from_yaml(yaml: &str, token: Option<String>) -> Result<Self> {
        let mut config: SyncConfig = serde_yaml::from_str(yaml)?;
        config.token = token.filter(|t| !t.is_empty());
        config.validate()?;
        Ok(config)
    }

    /// Endpoint for the configured environment
    pub fn endpoint(&self) -> &str {
        match self.environment {
            Environment::Development => &self.endpoints.development,
            Environment::Production => &self.endpoints.production,
        }
    }

    /// Build a client from this configuration
    pub fn client(&self) -> syncsockets::Result<SyncClient> {
        let mut builder = syncsockets::builder()
            .url(self.endpoint())
            .backoff(ExponentialBackoff::new(Duration::from_millis(self.backoff_base_ms)))
            .max_reconnect_attempts(self.max_reconnect_attempts);

        if let Some(secs) = self.heartbeat_secs {
            builder = builder.heartbeat(Duration::from_secs(secs));
        }
        if let Some(capacity) = self.max_queued_messages {
            builder = builder.max_queued_messages(capacity);
        }

        builder.build()
    }

    fn validate(&self) -> Result<()> {
        let endpoint = self.endpoint();
        if !(endpoint.starts_with("ws://") || endpoint.starts_with("wss://")) {
            return Err(ConfigError::ValidationError(format!(
                "{:?} endpoint must start with ws:// or wss://",
                self.environment
            )));
        }
        if self.user_id.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "user_id cannot be empty".to_string(),
            ));
        }
        if self.channels.iter().any(|c| c.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "channels cannot contain empty names".to_string(),
            ));
        }
        if self.backoff_base_ms == 0 {
            return Err(ConfigError::ValidationError(
                "backoff_base_ms must be greater than 0".to_string(),
            ));
        }
        if self.heartbeat_secs == Some(0) {
            return Err(ConfigError::ValidationError(
                "heartbeat_secs must be greater than 0".to_string(),
            ));
        }
        if self.max_queued_messages == Some(0) {
            return Err(ConfigError::ValidationError(
                "max_queued_messages must be greater than 0".to_string(),
            ));
        }
        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(
                format!("log_level must be one of: {}", valid_levels.join(", ")),
            ));
        }
        // Production servers reject anonymous connections
        if self.environment == Environment::Production && self.token.is_none() {
            return Err(ConfigError::EnvVarMissing(TOKEN_ENV_VAR.to_string()));
        }
        Ok(())
    }

    /// Log configuration summary
    pub fn log(&self) {
        info!("Configuration loaded:");
        info!("  Environment: {:?}", self.environment);
        info!("  Endpoint: {}", self.endpoint());
        info!("  User: {}", self.user_id);
        info!("  Channels: {}", self.channels.join(", "));
        info!("  Max reconnect attempts: {}", self.max_reconnect_attempts);
        info!("  Backoff base: {}ms", self.backoff_base_ms);
        match self.heartbeat_secs {
            Some(secs) => info!("  Heartbeat: every {}s", secs),
            None => info!("  Heartbeat: off"),
        }
        info!("  Token: {}", if self.token.is_some() { "set" } else { "not set" });
        info!("  Log level: {}", self.log_level);
    }
}
