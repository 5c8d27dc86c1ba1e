//! Shared realtime subscription cache.
//!
//! Deduplicates live listeners on the hosted document database by cache key.
//! Any number of consumers subscribing to the same key share one upstream
//! listener; each consumer gets the entry's full state on registration and
//! again on every change. One-shot reads ride on the same entries, so a read
//! against a warm key settles from cached state without touching the network.
//!
//! Upstream listeners are never closed when an entry loses its last
//! consumer. They live until [`SubscriptionCache::clear`], which suits a
//! small, bounded key space such as per-user collections.
//!
//! # Example
//!
//! ```ignore
//! let cache = SubscriptionCache::new(source);
//! let query = CollectionQuery::new("users/u1/workouts").order_by("createdAt", Direction::Desc);
//! let subscription = cache.subscribe_to_collection(
//!     &query.cache_key(),
//!     CollectionOptions::for_query(query),
//!     |state| println!("{} workouts, loading={}", state.data.len(), state.loading),
//! )?;
//! ```

mod options;
mod registry;

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::oneshot;

use crate::domain::errors::{CacheError, CacheResult, UpstreamError};
use crate::domain::models::{
    CacheConfig, CacheState, CollectionQuery, DocumentRef, DocumentSnapshot,
};
use crate::domain::ports::{LiveQuerySource, SnapshotObserver};

pub use options::{
    CollectionMapper, CollectionOptions, DocumentMapper, DocumentOptions, QueryFactory,
    RefFactory,
};
use registry::{lock, RawState, Registry};

/// Handle for one registered listener.
///
/// [`Subscription::unsubscribe`] removes only this listener and is
/// idempotent. Dropping the handle unsubscribes as well.
#[must_use = "dropping a Subscription unsubscribes its listener"]
pub struct Subscription {
    detach: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Subscription {
    fn new(detach: impl FnOnce() + Send + 'static) -> Self {
        Self {
            detach: Mutex::new(Some(Box::new(detach))),
        }
    }

    /// Remove this listener; later calls do nothing.
    pub fn unsubscribe(&self) {
        let detach = lock(&self.detach).take();
        if let Some(detach) = detach {
            detach();
        }
    }

    /// Whether the listener is still registered by this handle.
    pub fn is_active(&self) -> bool {
        lock(&self.detach).is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Point-in-time counters across both registries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Collection entries in the registry.
    pub collection_entries: usize,
    /// Document entries in the registry.
    pub document_entries: usize,
    /// Registered listeners across all entries.
    pub listeners: usize,
    /// Upstream listeners currently open.
    pub open_upstreams: usize,
}

/// Process-wide cache of live collection and document listeners.
///
/// Construct one per backend connection and share it through `Arc`.
pub struct SubscriptionCache {
    source: Arc<dyn LiveQuerySource>,
    collections: Registry<CollectionQuery, Vec<DocumentSnapshot>>,
    documents: Registry<DocumentRef, Option<DocumentSnapshot>>,
    config: CacheConfig,
}

impl SubscriptionCache {
    /// Cache over `source` with default settings.
    pub fn new(source: Arc<dyn LiveQuerySource>) -> Self {
        Self::with_config(source, CacheConfig::default())
    }

    /// Cache over `source` with explicit settings.
    pub fn with_config(source: Arc<dyn LiveQuerySource>, config: CacheConfig) -> Self {
        Self {
            source,
            collections: Registry::new("collection"),
            documents: Registry::new("document"),
            config,
        }
    }

    /// Settings this cache was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Subscribe to the collection entry for `key`.
    ///
    /// Opens the upstream listener on the first registration for `key` (or
    /// the first after a [`clear`](Self::clear)). `on_update` is invoked with
    /// the current state before this returns and again on every change;
    /// upstream errors arrive as `CacheState::error`.
    pub fn subscribe_to_collection<T, F>(
        &self,
        key: &str,
        options: CollectionOptions<T>,
        on_update: F,
    ) -> CacheResult<Subscription>
    where
        T: 'static,
        F: Fn(CacheState<Vec<T>>) + Send + Sync + 'static,
    {
        validate_key(key)?;
        let CollectionOptions { query_factory, map } = options;

        let notify = move |raw: &RawState<Vec<DocumentSnapshot>>| {
            on_update(CacheState {
                data: raw.snapshot.iter().map(|snapshot| map(snapshot)).collect(),
                loading: raw.loading,
                error: raw.error.clone(),
            });
        };

        let handle = self.collections.subscribe(
            key,
            query_factory,
            |query, observer| self.source.listen_query(query, observer),
            Box::new(notify),
        );
        Ok(Subscription::new(move || handle.detach()))
    }

    /// Resolve once with the first settled state of the collection entry.
    ///
    /// Settles immediately when the entry is already warm. Upstream errors
    /// become `CacheError::Upstream`.
    pub async fn get_collection_data<T>(
        &self,
        key: &str,
        options: CollectionOptions<T>,
    ) -> CacheResult<Vec<T>>
    where
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let tx = Mutex::new(Some(tx));
        let subscription = self.subscribe_to_collection(key, options, move |state| {
            settle(&tx, state);
        })?;

        let outcome = self.wait_settled(key, rx).await;
        subscription.unsubscribe();
        outcome
    }

    /// Subscribe to the document entry for `key`.
    ///
    /// Same contract as [`subscribe_to_collection`](Self::subscribe_to_collection).
    pub fn subscribe_to_document<T, F>(
        &self,
        key: &str,
        options: DocumentOptions<T>,
        on_update: F,
    ) -> CacheResult<Subscription>
    where
        T: 'static,
        F: Fn(CacheState<Option<T>>) + Send + Sync + 'static,
    {
        validate_key(key)?;
        let DocumentOptions { ref_factory, map } = options;

        let notify = move |raw: &RawState<Option<DocumentSnapshot>>| {
            on_update(CacheState {
                data: map((*raw.snapshot).as_ref()),
                loading: raw.loading,
                error: raw.error.clone(),
            });
        };

        let handle = self.documents.subscribe(
            key,
            ref_factory,
            |reference, observer: SnapshotObserver<Option<DocumentSnapshot>>| {
                self.source.listen_document(
                    reference,
                    Arc::new(move |event: Result<DocumentSnapshot, UpstreamError>| {
                        observer(event.map(Some));
                    }),
                )
            },
            Box::new(notify),
        );
        Ok(Subscription::new(move || handle.detach()))
    }

    /// Resolve once with the first settled state of the document entry.
    pub async fn get_document_data<T>(
        &self,
        key: &str,
        options: DocumentOptions<T>,
    ) -> CacheResult<Option<T>>
    where
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let tx = Mutex::new(Some(tx));
        let subscription = self.subscribe_to_document(key, options, move |state| {
            settle(&tx, state);
        })?;

        let outcome = self.wait_settled(key, rx).await;
        subscription.unsubscribe();
        outcome
    }

    /// Close every upstream listener and forget every entry.
    ///
    /// Registered listeners are dropped without a final notification and
    /// pending one-shot reads fail with `CacheError::Cleared`. Meant for
    /// resets and test isolation.
    pub fn clear(&self) {
        let collections = self.collections.clear();
        let documents = self.documents.clear();
        tracing::info!(collections, documents, "subscription cache cleared");
    }

    /// Collection keys with an entry, sorted.
    pub fn collection_keys(&self) -> Vec<String> {
        self.collections.keys()
    }

    /// Document keys with an entry, sorted.
    pub fn document_keys(&self) -> Vec<String> {
        self.documents.keys()
    }

    /// Listener count for a collection key, `None` if the key has no entry.
    pub fn collection_listener_count(&self, key: &str) -> Option<usize> {
        self.collections.listener_count(key)
    }

    /// Listener count for a document key, `None` if the key has no entry.
    pub fn document_listener_count(&self, key: &str) -> Option<usize> {
        self.documents.listener_count(key)
    }

    /// Counters across both registries.
    pub fn stats(&self) -> CacheStats {
        let collections = self.collections.stats();
        let documents = self.documents.stats();
        CacheStats {
            collection_entries: collections.entries,
            document_entries: documents.entries,
            listeners: collections.listeners + documents.listeners,
            open_upstreams: collections.open_upstreams + documents.open_upstreams,
        }
    }

    async fn wait_settled<T>(
        &self,
        key: &str,
        rx: oneshot::Receiver<CacheResult<T>>,
    ) -> CacheResult<T> {
        let received = match self.config.get_timeout() {
            Some(timeout) => match tokio::time::timeout(timeout, rx).await {
                Ok(received) => received,
                Err(_) => {
                    return Err(CacheError::Timeout {
                        key: key.to_string(),
                        timeout_ms: self.config.get_timeout_ms,
                    })
                }
            },
            None => rx.await,
        };
        received.unwrap_or_else(|_| Err(CacheError::Cleared(key.to_string())))
    }
}

impl std::fmt::Debug for SubscriptionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionCache")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

fn validate_key(key: &str) -> CacheResult<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey);
    }
    Ok(())
}

/// Forward the first settled state into a one-shot channel.
fn settle<T>(tx: &Mutex<Option<oneshot::Sender<CacheResult<T>>>>, state: CacheState<T>) {
    if state.loading {
        return;
    }
    let Some(tx) = lock(tx).take() else {
        return;
    };
    let outcome = match state.error {
        Some(error) => Err(CacheError::Upstream(error)),
        None => Ok(state.data),
    };
    // The reader may have timed out and gone away.
    let _ = tx.send(outcome);
}
