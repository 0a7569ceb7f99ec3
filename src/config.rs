//! Dispatch configuration from defaults, the environment, or TOML.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub const ENV_COMMAND_TIMEOUT_MS: &str = "DISPATCH_COMMAND_TIMEOUT_MS";
pub const ENV_LOG: &str = "DISPATCH_LOG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Applied by `CommandBus::dispatch` when the caller's context has no
    /// deadline of its own.
    pub command_timeout: Duration,
    /// `tracing_subscriber::EnvFilter` directive.
    pub log_filter: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_secs(30),
            log_filter: "info".to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    command_timeout_ms: Option<u64>,
    log_filter: Option<String>,
}

impl DispatchConfig {
    /// Defaults overridden by `DISPATCH_COMMAND_TIMEOUT_MS` and `DISPATCH_LOG`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(value) = lookup(ENV_COMMAND_TIMEOUT_MS) {
            config.command_timeout = parse_timeout(ENV_COMMAND_TIMEOUT_MS, &value)?;
        }
        if let Some(filter) = lookup(ENV_LOG) {
            config.log_filter = filter;
        }
        Ok(config)
    }

    /// Defaults overridden by `command_timeout_ms` and `log_filter` keys.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(source)?;
        let mut config = Self::default();
        if let Some(ms) = raw.command_timeout_ms {
            if ms == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "command_timeout_ms",
                    value: ms.to_string(),
                });
            }
            config.command_timeout = Duration::from_millis(ms);
        }
        if let Some(filter) = raw.log_filter {
            config.log_filter = filter;
        }
        Ok(config)
    }
}

fn parse_timeout(key: &'static str, value: &str) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}
