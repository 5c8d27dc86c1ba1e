//! Property tests for key deduplication and fan-out.

mod common;

use common::{cache_with_store, fields, Recorder};
use proptest::prelude::*;
use repsync::{CollectionOptions, CollectionQuery, DeliveryMode, Subscription};
use serde_json::{json, Value};

proptest! {
    /// Any number of subscriptions to one key, with any subset later
    /// unsubscribed, opens exactly one upstream listener and notifies each
    /// remaining listener exactly once per change.
    #[test]
    fn prop_one_upstream_per_key(
        keep in prop::collection::vec(any::<bool>(), 1..16),
        writes in 0usize..4,
    ) {
        let (cache, store) = cache_with_store(DeliveryMode::Manual);
        let options = CollectionOptions::for_query(CollectionQuery::new("exercises"));

        let mut kept: Vec<(Recorder<Vec<Value>>, Subscription)> = Vec::new();
        for keep_it in &keep {
            let recorder = Recorder::new();
            let subscription = cache
                .subscribe_to_collection("exercises:all", options.clone(), recorder.callback())
                .unwrap();
            if *keep_it {
                kept.push((recorder, subscription));
            }
        }
        store.flush();

        for i in 0..writes {
            store.seed("exercises", &format!("e{i}"), fields(json!({"n": i})));
            store.flush();
        }

        prop_assert_eq!(store.listen_calls(), 1);
        prop_assert_eq!(
            cache.collection_listener_count("exercises:all"),
            Some(kept.len())
        );
        for (recorder, _subscription) in &kept {
            // loading, initial snapshot, then one per write
            prop_assert_eq!(recorder.len(), 2 + writes);
            prop_assert_eq!(recorder.last().data.len(), writes);
        }
    }

    /// Distinct keys never share an upstream listener.
    #[test]
    fn prop_distinct_keys_open_distinct_upstreams(keys in prop::collection::btree_set("[a-z]{1,6}", 1..8)) {
        let (cache, store) = cache_with_store(DeliveryMode::Immediate);
        let subscriptions: Vec<Subscription> = keys
            .iter()
            .map(|key| {
                cache
                    .subscribe_to_collection(
                        key,
                        CollectionOptions::for_query(CollectionQuery::new(key.clone())),
                        |_| {},
                    )
                    .unwrap()
            })
            .collect();

        prop_assert_eq!(store.listen_calls(), keys.len());
        prop_assert_eq!(cache.stats().open_upstreams, keys.len());
        prop_assert_eq!(cache.stats().listeners, subscriptions.len());
    }
}
