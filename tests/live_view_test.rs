//! Consumer views over the cache: ordering defaults, live updates and one-shot document reads.

mod common;

use std::time::Duration;

use common::{cache_with_config, cache_with_store, fields};
use repsync::{
    CacheConfig, CollectionQuery, DeliveryMode, Direction, DocumentRef, DocumentWriter,
    EntryStatus, ErrorCode, LiveCollection, LiveDocument, UpstreamError,
};
use serde_json::{json, Value};

#[tokio::test]
async fn test_live_collection_applies_default_ordering_and_follows_writes() {
    let (cache, store) = cache_with_store(DeliveryMode::Immediate);
    store
        .add_document("users/u1/prs", fields(json!({"exercise": "squat", "weight": 140})))
        .await
        .unwrap();

    let mut view = LiveCollection::open(&cache, CollectionQuery::new("users/u1/prs"), None).unwrap();
    assert_eq!(view.key(), "collection:users/u1/prs:createdAt:desc:");
    assert_eq!(view.state().status(), EntryStatus::Ready);
    assert_eq!(view.state().data.len(), 1);

    store
        .add_document("users/u1/prs", fields(json!({"exercise": "deadlift", "weight": 180})))
        .await
        .unwrap();
    assert!(view.changed().await);

    let state = view.state();
    assert_eq!(state.data.len(), 2);
    assert_eq!(state.data[0]["exercise"], "deadlift", "newest first");
    assert!(state.data.iter().all(|record| record["id"].is_string()));
}

#[tokio::test]
async fn test_live_collection_custom_key_and_mapper() {
    let config = CacheConfig {
        default_order_field: "weight".to_string(),
        default_order_direction: Direction::Asc,
        ..CacheConfig::default()
    };
    let (cache, store) = cache_with_config(DeliveryMode::Immediate, config);
    store.seed("users/u1/prs", "a", fields(json!({"weight": 180})));
    store.seed("users/u1/prs", "b", fields(json!({"weight": 100})));

    let view = LiveCollection::open_with(
        &cache,
        CollectionQuery::new("users/u1/prs"),
        Some("prs:user1"),
        |record: Value| record["weight"].as_u64().unwrap_or_default(),
    )
    .unwrap();

    assert_eq!(view.key(), "prs:user1");
    assert_eq!(view.state().data, vec![100, 180]);
    assert_eq!(cache.collection_keys(), vec!["prs:user1".to_string()]);
}

#[tokio::test]
async fn test_closing_view_unsubscribes_only_itself() {
    let (cache, store) = cache_with_store(DeliveryMode::Immediate);
    let query = CollectionQuery::new("exercises").order_by("name", Direction::Asc);

    let first = LiveCollection::open(&cache, query.clone(), None).unwrap();
    let second = LiveCollection::open(&cache, query, None).unwrap();
    let key = first.key().to_string();
    assert_eq!(cache.collection_listener_count(&key), Some(2));

    first.close();
    assert_eq!(cache.collection_listener_count(&key), Some(1));
    drop(second);
    assert_eq!(cache.collection_listener_count(&key), Some(0));
    assert_eq!(store.open_listeners(), 1);
}

#[tokio::test]
async fn test_live_view_surfaces_upstream_errors() {
    let (cache, store) = cache_with_store(DeliveryMode::Immediate);
    let mut view = LiveCollection::open(&cache, CollectionQuery::new("users/u1/workouts"), None).unwrap();

    store.emit_error("users/u1/workouts", UpstreamError::permission_denied("rules"));
    assert!(view.changed().await);

    let state = view.state();
    assert_eq!(state.status(), EntryStatus::Error);
    assert_eq!(state.error.map(|e| e.code), Some(ErrorCode::PermissionDenied));
}

#[tokio::test]
async fn test_live_document_listen_mode() {
    let (cache, store) = cache_with_store(DeliveryMode::Immediate);
    let mut view = LiveDocument::open(&cache, DocumentRef::new("users/u1"), true, None).unwrap();
    assert!(view.is_live());
    assert_eq!(view.state().data, None);
    assert!(!view.state().loading);

    store
        .set_document("users", "u1", fields(json!({"displayName": "Ana"})), true)
        .await
        .unwrap();
    assert!(view.changed().await);

    let record = view.state().data.unwrap();
    assert_eq!(record["id"], "u1");
    assert_eq!(record["displayName"], "Ana");
}

#[tokio::test]
async fn test_live_document_read_once_settles_without_listener() {
    let (cache, store) = cache_with_store(DeliveryMode::Immediate);
    store.seed("exercises", "bench", fields(json!({"name": "Bench Press"})));

    let mut view = LiveDocument::open_with(
        &cache,
        DocumentRef::new("exercises/bench"),
        false,
        None,
        |record: Value| record["name"].as_str().unwrap_or_default().to_string(),
    )
    .unwrap();
    assert!(!view.is_live());

    tokio::time::timeout(Duration::from_secs(1), async {
        while view.state().loading {
            assert!(view.changed().await);
        }
    })
    .await
    .unwrap();

    assert_eq!(view.state().data.as_deref(), Some("Bench Press"));
    assert_eq!(
        cache.document_listener_count("document:exercises/bench"),
        Some(0)
    );

    store
        .update_document("exercises", "bench", fields(json!({"name": "Incline"})))
        .await
        .unwrap();
    assert_eq!(view.state().data.as_deref(), Some("Bench Press"));
}

#[tokio::test]
async fn test_live_document_read_once_reports_timeout_as_error_state() {
    let config = CacheConfig {
        get_timeout_ms: 20,
        ..CacheConfig::default()
    };
    let (cache, _store) = cache_with_config(DeliveryMode::Manual, config);

    let mut view = LiveDocument::open(&cache, DocumentRef::new("users/u9"), false, None).unwrap();
    assert!(view.changed().await);

    let state = view.state();
    assert!(!state.loading);
    assert_eq!(state.error.map(|e| e.code), Some(ErrorCode::DeadlineExceeded));
}

#[tokio::test]
async fn test_live_document_rejects_empty_key() {
    let (cache, store) = cache_with_store(DeliveryMode::Immediate);
    assert!(LiveDocument::open(&cache, DocumentRef::new("users/u1"), true, Some("")).is_err());
    assert_eq!(store.listen_calls(), 0);
}
