//! Common test utilities for integration tests
//!
//! Shared fixtures and recorders used across the cache, view and CLI tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use repsync::{CacheConfig, CacheState, DeliveryMode, DocumentData, MemoryStore, SubscriptionCache};
use serde_json::{json, Value};
use tempfile::TempDir;

/// Setup test logging
///
/// Call at the beginning of tests that should print cache traces.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Object literal to document fields.
pub fn fields(value: Value) -> DocumentData {
    value
        .as_object()
        .cloned()
        .expect("document literal must be a JSON object")
}

/// A cache over a fresh store, both shared.
pub fn cache_with_store(mode: DeliveryMode) -> (Arc<SubscriptionCache>, Arc<MemoryStore>) {
    cache_with_config(mode, CacheConfig::default())
}

pub fn cache_with_config(
    mode: DeliveryMode,
    config: CacheConfig,
) -> (Arc<SubscriptionCache>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::with_mode(mode));
    let cache = Arc::new(SubscriptionCache::with_config(store.clone(), config));
    (cache, store)
}

/// Records every state a subscriber receives.
pub struct Recorder<T> {
    states: Arc<Mutex<Vec<CacheState<T>>>>,
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            states: Arc::clone(&self.states),
        }
    }
}

impl<T: Clone + Send + 'static> Recorder<T> {
    pub fn new() -> Self {
        Self {
            states: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn callback(&self) -> impl Fn(CacheState<T>) + Send + Sync + 'static {
        let states = Arc::clone(&self.states);
        move |state| states.lock().unwrap().push(state)
    }

    pub fn len(&self) -> usize {
        self.states.lock().unwrap().len()
    }

    pub fn states(&self) -> Vec<CacheState<T>> {
        self.states.lock().unwrap().clone()
    }

    pub fn last(&self) -> CacheState<T> {
        self.states
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no state recorded")
    }
}

/// Two workouts under `users/u1/workouts` plus an exercise library.
pub fn gym_fixture() -> Value {
    json!({
        "users/u1/workouts": {
            "w1": {"name": "Push", "createdAt": "2024-01-01T10:00:00.000000Z", "periodizationId": "p1"},
            "w2": {"name": "Pull", "createdAt": "2024-01-02T10:00:00.000000Z", "periodizationId": "p2"}
        },
        "exercises": {
            "bench": {"name": "Bench Press", "muscle": "chest"},
            "squat": {"name": "Back Squat", "muscle": "legs"}
        }
    })
}

/// Write `fixture` into a temp dir and return its path.
pub fn fixture_file(fixture: &Value) -> (TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("fixture.json");
    std::fs::write(&path, serde_json::to_vec_pretty(fixture).unwrap()).unwrap();
    (dir, path)
}
