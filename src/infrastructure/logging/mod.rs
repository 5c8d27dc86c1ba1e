//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber. Console output
//! goes to stderr so command output on stdout stays machine-readable; an
//! optional rolling JSON file sink is provided by tracing-appender.

/// Logger settings.
pub mod config;
/// Subscriber installation.
pub mod logger;

pub use config::{LogConfig, LogFormat, RotationPolicy};
pub use logger::LoggerImpl;
