//! Listener-facing state of a cache entry.

use serde::Serialize;

use crate::domain::errors::UpstreamError;

/// Observable state of one cache entry, as seen by a listener.
///
/// Every notification carries the full state; consumers never need to
/// remember earlier notifications.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheState<T> {
    /// Mapped data; empty or `None` until the first snapshot.
    pub data: T,
    /// `true` until the first snapshot or error arrives.
    pub loading: bool,
    /// Most recent upstream error, cleared by the next snapshot.
    pub error: Option<UpstreamError>,
}

/// Coarse lifecycle of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// No snapshot or error yet.
    Loading,
    /// Holding a snapshot.
    Ready,
    /// Holding an upstream error.
    Error,
}

impl<T> CacheState<T> {
    /// Initial state holding `data`.
    pub fn loading(data: T) -> Self {
        Self {
            data,
            loading: true,
            error: None,
        }
    }

    /// Coarse lifecycle of this state.
    pub fn status(&self) -> EntryStatus {
        match (self.loading, &self.error) {
            (true, _) => EntryStatus::Loading,
            (false, None) => EntryStatus::Ready,
            (false, Some(_)) => EntryStatus::Error,
        }
    }

    /// `true` once a snapshot or error has arrived.
    pub fn is_settled(&self) -> bool {
        !self.loading
    }

    /// Transform the data, keeping `loading` and `error`.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CacheState<U> {
        CacheState {
            data: f(self.data),
            loading: self.loading,
            error: self.error,
        }
    }
}

impl<T: Default> Default for CacheState<T> {
    fn default() -> Self {
        Self::loading(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        let mut state: CacheState<Vec<u8>> = CacheState::default();
        assert_eq!(state.status(), EntryStatus::Loading);

        state.loading = false;
        assert_eq!(state.status(), EntryStatus::Ready);

        state.error = Some(UpstreamError::unavailable("offline"));
        assert_eq!(state.status(), EntryStatus::Error);
    }

    #[test]
    fn test_map_keeps_flags() {
        let state = CacheState {
            data: 2,
            loading: false,
            error: Some(UpstreamError::unavailable("x")),
        };
        let mapped = state.map(|n| n * 10);
        assert_eq!(mapped.data, 20);
        assert!(!mapped.loading);
        assert!(mapped.error.is_some());
    }
}
