//! Consumer-side views over the subscription cache.
//!
//! A view owns one cache subscription and republishes each
//! `CacheState` into a `tokio::sync::watch` channel, so UI code (or any
//! other consumer) can read the latest `{data, loading, error}` or await the
//! next change. Closing or dropping the view unsubscribes it; the shared
//! upstream listener stays with the cache.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::domain::errors::{CacheError, CacheResult, ErrorCode, UpstreamError};
use crate::domain::models::{CacheState, CollectionQuery, DocumentRef, DocumentSnapshot};
use crate::services::subscription_cache::{
    CollectionOptions, DocumentOptions, Subscription, SubscriptionCache,
};

/// Live, ordered view of a collection query.
pub struct LiveCollection<T> {
    key: String,
    state: watch::Receiver<CacheState<Vec<T>>>,
    _subscription: Subscription,
}

impl LiveCollection<Value> {
    /// Open a view yielding `{ "id": .., ...fields }` records.
    pub fn open(
        cache: &SubscriptionCache,
        query: CollectionQuery,
        cache_key: Option<&str>,
    ) -> CacheResult<Self> {
        Self::open_with(cache, query, cache_key, |record| record)
    }
}

impl<T> LiveCollection<T>
where
    T: Send + Sync + 'static,
{
    /// Open a view, shaping each record with `map`.
    ///
    /// Queries without an explicit ordering get the cache's default
    /// ordering. The cache key defaults to [`CollectionQuery::cache_key`].
    pub fn open_with(
        cache: &SubscriptionCache,
        query: CollectionQuery,
        cache_key: Option<&str>,
        map: impl Fn(Value) -> T + Send + Sync + 'static,
    ) -> CacheResult<Self> {
        let query = if query.order_by.is_some() {
            query
        } else {
            let config = cache.config();
            query.order_by(
                config.default_order_field.clone(),
                config.default_order_direction,
            )
        };
        let key = cache_key.map_or_else(|| query.cache_key(), str::to_string);

        let options = CollectionOptions::for_query(query).map(move |snapshot: &DocumentSnapshot| {
            map(snapshot.to_record().unwrap_or(Value::Null))
        });

        let (tx, state) = watch::channel(CacheState::loading(Vec::new()));
        let subscription = cache.subscribe_to_collection(&key, options, move |update| {
            tx.send_replace(update);
        })?;

        Ok(Self {
            key,
            state,
            _subscription: subscription,
        })
    }

    /// Cache key this view is registered under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Wait for the next state; `false` once the cache dropped the listener.
    pub async fn changed(&mut self) -> bool {
        self.state.changed().await.is_ok()
    }

    /// A new receiver of the view's state.
    pub fn receiver(&self) -> watch::Receiver<CacheState<Vec<T>>> {
        self.state.clone()
    }

    /// Unsubscribe this view.
    pub fn close(self) {}
}

impl<T: Clone> LiveCollection<T> {
    /// Latest published state.
    pub fn state(&self) -> CacheState<Vec<T>> {
        self.state.borrow().clone()
    }
}

enum DocumentFeed {
    Live(Subscription),
    Once(JoinHandle<()>),
}

/// Live (or read-once) view of a single document.
pub struct LiveDocument<T> {
    key: String,
    state: watch::Receiver<CacheState<Option<T>>>,
    feed: DocumentFeed,
}

impl LiveDocument<Value> {
    /// Open a document view yielding `{ "id": .., ...fields }` records.
    pub fn open(
        cache: &Arc<SubscriptionCache>,
        reference: DocumentRef,
        listen: bool,
        cache_key: Option<&str>,
    ) -> CacheResult<Self> {
        Self::open_with(cache, reference, listen, cache_key, |record| record)
    }
}

impl<T> LiveDocument<T>
where
    T: Send + Sync + 'static,
{
    /// Open a document view.
    ///
    /// With `listen` the view follows every change. Without it the view
    /// performs one read on a spawned task (requires a Tokio runtime) and
    /// publishes a single settled state.
    pub fn open_with(
        cache: &Arc<SubscriptionCache>,
        reference: DocumentRef,
        listen: bool,
        cache_key: Option<&str>,
        map: impl Fn(Value) -> T + Send + Sync + 'static,
    ) -> CacheResult<Self> {
        let key = cache_key.map_or_else(|| reference.cache_key(), str::to_string);
        if key.is_empty() {
            return Err(CacheError::InvalidKey);
        }
        let options = DocumentOptions::for_ref(reference)
            .map(move |snapshot: Option<&DocumentSnapshot>| {
                snapshot.and_then(DocumentSnapshot::to_record).map(&map)
            });

        let (tx, state) = watch::channel(CacheState::loading(None));

        let feed = if listen {
            let subscription = cache.subscribe_to_document(&key, options, move |update| {
                tx.send_replace(update);
            })?;
            DocumentFeed::Live(subscription)
        } else {
            let cache = Arc::clone(cache);
            let read_key = key.clone();
            DocumentFeed::Once(tokio::spawn(async move {
                let outcome = cache.get_document_data(&read_key, options).await;
                if tx.is_closed() {
                    return;
                }
                let settled = match outcome {
                    Ok(data) => CacheState {
                        data,
                        loading: false,
                        error: None,
                    },
                    Err(err) => {
                        tracing::debug!(key = %read_key, error = %err, "document read failed");
                        CacheState {
                            data: None,
                            loading: false,
                            error: Some(as_upstream(err)),
                        }
                    }
                };
                tx.send_replace(settled);
            }))
        };

        Ok(Self { key, state, feed })
    }

    /// Cache key this view reads through.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether the view follows changes.
    pub fn is_live(&self) -> bool {
        matches!(self.feed, DocumentFeed::Live(_))
    }

    /// Wait for the next state; `false` once no more states can arrive.
    pub async fn changed(&mut self) -> bool {
        self.state.changed().await.is_ok()
    }

    /// A new receiver of the view's state.
    pub fn receiver(&self) -> watch::Receiver<CacheState<Option<T>>> {
        self.state.clone()
    }

    /// Unsubscribe, or abandon a pending read.
    pub fn close(self) {}
}

impl<T: Clone> LiveDocument<T> {
    /// Latest published state.
    pub fn state(&self) -> CacheState<Option<T>> {
        self.state.borrow().clone()
    }
}

impl<T> Drop for LiveDocument<T> {
    fn drop(&mut self) {
        if let DocumentFeed::Once(task) = &self.feed {
            task.abort();
        }
    }
}

/// Views only expose `UpstreamError`; local read failures get the closest code.
fn as_upstream(err: CacheError) -> UpstreamError {
    match err {
        CacheError::Upstream(upstream) => upstream,
        CacheError::Timeout { .. } => {
            UpstreamError::new(ErrorCode::DeadlineExceeded, err.to_string())
        }
        CacheError::Cleared(_) | CacheError::InvalidKey => {
            UpstreamError::new(ErrorCode::Cancelled, err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_upstream_keeps_upstream_errors() {
        let upstream = UpstreamError::permission_denied("rules");
        assert_eq!(as_upstream(CacheError::Upstream(upstream.clone())), upstream);
    }

    #[test]
    fn test_as_upstream_maps_local_failures() {
        let timeout = CacheError::Timeout {
            key: "document:a/b".to_string(),
            timeout_ms: 50,
        };
        assert_eq!(as_upstream(timeout).code, ErrorCode::DeadlineExceeded);
        assert_eq!(
            as_upstream(CacheError::Cleared("k".to_string())).code,
            ErrorCode::Cancelled
        );
    }
}
