//! Configuration management infrastructure
//!
//! Hierarchical configuration using figment:
//! - YAML file loading from `.repsync/`
//! - `REPSYNC_*` environment variable overrides
//! - Configuration validation

/// figment-based loader.
pub mod loader;

pub use loader::{ConfigError, ConfigLoader};
