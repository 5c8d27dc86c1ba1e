//! Domain layer for repsync
//!
//! Models, errors and the port traits the subscription cache depends on.

/// Error types.
pub mod errors;
/// Value types.
pub mod models;
/// Traits implemented by adapters.
pub mod ports;

pub use errors::{CacheError, CacheResult, ErrorCode, UpstreamError};
