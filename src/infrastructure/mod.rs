//! Infrastructure layer module
//!
//! Ambient concerns shared by the library and the binary:
//! - Configuration management (figment)
//! - Logging infrastructure (tracing)

/// Configuration loading.
pub mod config;
/// Structured logging.
pub mod logging;
