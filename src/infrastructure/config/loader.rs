//! Hierarchical configuration loading with figment.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Unknown `logging.level`.
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    /// Unknown `logging.format`.
    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    /// Blank `cache.default_order_field`.
    #[error("cache.default_order_field cannot be empty")]
    EmptyOrderField,

    /// Any other invalid setting.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration relative to the current directory.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .repsync/config.yaml
    /// 3. .repsync/local.yaml (optional local overrides)
    /// 4. Environment variables (REPSYNC_* prefix, `__` separates nested keys)
    pub fn load() -> Result<Config> {
        Self::load_from_dir(".repsync")
    }

    /// Same as [`load`](Self::load) with an explicit config directory.
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Config> {
        let dir = dir.as_ref();
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(dir.join("config.yaml")))
            .merge(Yaml::file(dir.join("local.yaml")))
            .merge(Env::prefixed("REPSYNC_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, skipping the environment.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if let Some(dir) = &config.logging.log_dir {
            if dir.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "logging.log_dir cannot be blank; omit it for stdout only".to_string(),
                ));
            }
        }

        if config.cache.default_order_field.trim().is_empty() {
            return Err(ConfigError::EmptyOrderField);
        }

        Ok(())
    }

    /// Directory used by [`load`](Self::load).
    pub fn default_dir() -> PathBuf {
        PathBuf::from(".repsync")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Direction;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(config.cache.get_timeout_ms, 0);
        assert_eq!(config.cache.default_order_field, "createdAt");
        assert_eq!(config.cache.default_order_direction, Direction::Desc);
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
logging:
  level: debug
  format: json
cache:
  get_timeout_ms: 2500
  default_order_field: date
  default_order_direction: asc
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.cache.get_timeout_ms, 2500);
        assert_eq!(config.cache.default_order_field, "date");
        assert_eq!(config.cache.default_order_direction, Direction::Asc);
        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidLogLevel(level) => assert_eq!(level, "loud"),
            other => panic!("Expected InvalidLogLevel, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidLogFormat(format) if format == "xml"
        ));
    }

    #[test]
    fn test_validate_empty_order_field() {
        let mut config = Config::default();
        config.cache.default_order_field = "  ".to_string();

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::EmptyOrderField
        ));
    }

    #[test]
    fn test_validate_blank_log_dir() {
        let mut config = Config::default();
        config.logging.log_dir = Some(String::new());

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::ValidationFailed(_)
        ));
    }

    #[test]
    fn test_hierarchical_merging() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("config.yaml"),
            "logging:\n  level: info\n  format: json\ncache:\n  get_timeout_ms: 100\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("local.yaml"),
            "logging:\n  level: debug\n",
        )
        .unwrap();

        let config = temp_env::with_var_unset("REPSYNC_LOGGING__LEVEL", || {
            ConfigLoader::load_from_dir(dir.path()).unwrap()
        });

        assert_eq!(config.logging.level, "debug", "Local override should win");
        assert_eq!(
            config.logging.format, "json",
            "Base value should persist when not overridden"
        );
        assert_eq!(config.cache.get_timeout_ms, 100);
    }

    #[test]
    fn test_env_override() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.yaml"), "cache:\n  get_timeout_ms: 100\n").unwrap();

        let config = temp_env::with_vars(
            [
                ("REPSYNC_CACHE__GET_TIMEOUT_MS", Some("750")),
                ("REPSYNC_LOGGING__LEVEL", Some("warn")),
            ],
            || ConfigLoader::load_from_dir(dir.path()).unwrap(),
        );

        assert_eq!(config.cache.get_timeout_ms, 750);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_missing_files_fall_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let config = temp_env::with_vars_unset(
            ["REPSYNC_LOGGING__LEVEL", "REPSYNC_CACHE__GET_TIMEOUT_MS"],
            || ConfigLoader::load_from_dir(dir.path().join("absent")).unwrap(),
        );
        assert_eq!(config.cache.default_order_field, "createdAt");
    }

    #[test]
    fn test_load_from_file_rejects_invalid_values() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "logging:\n  format: xml").unwrap();
        file.flush().unwrap();

        assert!(ConfigLoader::load_from_file(file.path()).is_err());
    }
}
