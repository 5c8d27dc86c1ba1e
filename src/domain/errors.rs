//! Domain errors for the repsync subscription cache.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status codes reported by the hosted document database.
///
/// Mirrors the canonical codes the upstream SDK attaches to listener and
/// write failures. The cache never interprets them; they are carried to
/// listeners as data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    /// The operation was cancelled.
    Cancelled,
    /// Unclassified failure.
    Unknown,
    /// The request was malformed.
    InvalidArgument,
    /// The operation did not finish in time.
    DeadlineExceeded,
    /// The document does not exist.
    NotFound,
    /// The document already exists.
    AlreadyExists,
    /// Security rules rejected the request.
    PermissionDenied,
    /// A quota was exhausted.
    ResourceExhausted,
    /// The system is not in a state that allows the operation.
    FailedPrecondition,
    /// Aborted by a concurrent operation.
    Aborted,
    /// The backend is unreachable.
    Unavailable,
    /// No valid credentials.
    Unauthenticated,
    /// Backend internal error.
    Internal,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = match self {
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
            Self::InvalidArgument => "invalid-argument",
            Self::DeadlineExceeded => "deadline-exceeded",
            Self::NotFound => "not-found",
            Self::AlreadyExists => "already-exists",
            Self::PermissionDenied => "permission-denied",
            Self::ResourceExhausted => "resource-exhausted",
            Self::FailedPrecondition => "failed-precondition",
            Self::Aborted => "aborted",
            Self::Unavailable => "unavailable",
            Self::Unauthenticated => "unauthenticated",
            Self::Internal => "internal",
        };
        f.write_str(code)
    }
}

/// Error reported by the upstream live-query capability or a write.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct UpstreamError {
    /// Canonical status code.
    pub code: ErrorCode,
    /// Human-readable detail.
    pub message: String,
}

impl UpstreamError {
    /// Error with an explicit code.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// `permission-denied` error.
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PermissionDenied, message)
    }

    /// `unavailable` error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unavailable, message)
    }

    /// `not-found` error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// `invalid-argument` error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidArgument, message)
    }
}

/// Errors surfaced by cache operations.
///
/// Upstream failures only become a `CacheError` at the one-shot read
/// boundary; push subscribers see them as `CacheState::error`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// The cache key was empty.
    #[error("Cache key cannot be empty")]
    InvalidKey,

    /// The entry settled with an upstream error.
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    /// The cache was cleared while the read was pending.
    #[error("Cache was cleared before the read for '{0}' settled")]
    Cleared(String),

    /// The entry was still loading when the read timed out.
    #[error("Read for '{key}' still loading after {timeout_ms}ms")]
    Timeout {
        /// Key of the entry being read.
        key: String,
        /// Configured timeout.
        timeout_ms: u64,
    },
}

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_error_display_uses_wire_code() {
        let err = UpstreamError::permission_denied("missing rules");
        assert_eq!(err.to_string(), "permission-denied: missing rules");
    }

    #[test]
    fn test_error_code_serde_matches_display() {
        let json = serde_json::to_string(&ErrorCode::FailedPrecondition).unwrap();
        assert_eq!(json, "\"failed-precondition\"");
        assert_eq!(ErrorCode::FailedPrecondition.to_string(), "failed-precondition");
    }

    #[test]
    fn test_cache_error_from_upstream() {
        let err: CacheError = UpstreamError::unavailable("offline").into();
        assert!(matches!(err, CacheError::Upstream(ref e) if e.code == ErrorCode::Unavailable));
    }
}
