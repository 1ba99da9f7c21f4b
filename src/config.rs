use serde::Serialize;
use std::time::Duration;

pub const ENV_API_URL: &str = "WORKOUT_SYNC_API_URL";
pub const ENV_API_TOKEN: &str = "WORKOUT_SYNC_API_TOKEN";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "WORKOUT_SYNC_HTTP_TIMEOUT_SECS";
pub const ENV_NOTIFICATION_TTL_MS: &str = "WORKOUT_SYNC_NOTIFICATION_TTL_MS";

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_NOTIFICATION_TTL: Duration = Duration::from_secs(5);

/// Source of a configuration value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Runtime configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Root URL of the sync API
    pub api_url: ConfigValue<String>,
    /// Bearer token handed to the HTTP gateway. Never logged.
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
    /// Per-request HTTP timeout
    pub http_timeout: ConfigValue<Duration>,
    /// How long a notification stays visible
    pub notification_ttl: ConfigValue<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: ConfigValue::new(DEFAULT_API_URL.to_string(), ConfigSource::Default),
            api_token: None,
            http_timeout: ConfigValue::new(DEFAULT_HTTP_TIMEOUT, ConfigSource::Default),
            notification_ttl: ConfigValue::new(DEFAULT_NOTIFICATION_TTL, ConfigSource::Default),
        }
    }
}

impl Config {
    /// Load configuration with priority: env vars > defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            config.api_url = ConfigValue::new(url, ConfigSource::Environment);
        }

        config.api_token = lookup(ENV_API_TOKEN).filter(|v| !v.is_empty());

        if let Some(raw) = lookup(ENV_HTTP_TIMEOUT_SECS) {
            let secs = parse_number(ENV_HTTP_TIMEOUT_SECS, &raw)?;
            config.http_timeout =
                ConfigValue::new(Duration::from_secs(secs), ConfigSource::Environment);
        }

        if let Some(raw) = lookup(ENV_NOTIFICATION_TTL_MS) {
            let millis = parse_number(ENV_NOTIFICATION_TTL_MS, &raw)?;
            config.notification_ttl =
                ConfigValue::new(Duration::from_millis(millis), ConfigSource::Environment);
        }

        Ok(config)
    }
}

fn parse_number(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
        }),
        Ok(n) => Ok(n),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} (expected a positive integer)")]
    InvalidValue { key: &'static str, value: String },
}
