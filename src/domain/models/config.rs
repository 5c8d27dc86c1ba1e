//! Configuration models loaded by `ConfigLoader`.

use serde::{Deserialize, Serialize};

use super::query::Direction;

/// Main configuration structure for repsync
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Subscription cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
        }
    }
}

/// Subscription cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CacheConfig {
    /// Upper bound for a one-shot read to settle, in milliseconds (0 = wait forever)
    #[serde(default)]
    pub get_timeout_ms: u64,

    /// Field consumer views order collections by when none is given
    #[serde(default = "default_order_field")]
    pub default_order_field: String,

    /// Direction paired with `default_order_field`
    #[serde(default)]
    pub default_order_direction: Direction,
}

fn default_order_field() -> String {
    "createdAt".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            get_timeout_ms: 0,
            default_order_field: default_order_field(),
            default_order_direction: Direction::Desc,
        }
    }
}

impl CacheConfig {
    /// One-shot read timeout, `None` when reads wait forever.
    pub fn get_timeout(&self) -> Option<std::time::Duration> {
        (self.get_timeout_ms > 0).then(|| std::time::Duration::from_millis(self.get_timeout_ms))
    }
}
