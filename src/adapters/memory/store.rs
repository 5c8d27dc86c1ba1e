//! In-process document store with live listeners.
//!
//! Stands in for the hosted database in tests, demos and the CLI. Every
//! write re-evaluates the listeners attached to the touched collection or
//! document and delivers a fresh snapshot to each. Observers are always
//! invoked with the store lock released, so an observer may write back into
//! the store.
//!
//! Each listener owns a [`Feed`]: events are queued on it in the order their
//! snapshots were computed (under the store lock) and drained by one thread
//! at a time, so a listener sees its events serially and never out of order,
//! even with concurrent writers.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use serde_json::Value;
use uuid::Uuid;

use super::query_eval::evaluate;
use crate::domain::errors::UpstreamError;
use crate::domain::models::{CollectionQuery, DocumentData, DocumentRef, DocumentSnapshot};
use crate::domain::ports::{
    DocumentWriter, ListenerRegistration, LiveQuerySource, SnapshotObserver,
};

/// When listeners receive snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    /// Deliver synchronously on listen and on every write.
    #[default]
    Immediate,
    /// Queue deliveries until [`MemoryStore::flush`].
    Manual,
}

struct FeedQueue<S> {
    events: VecDeque<Result<S, UpstreamError>>,
    draining: bool,
    closed: bool,
}

/// Ordered, serial event queue in front of one observer.
struct Feed<S> {
    observer: SnapshotObserver<S>,
    queue: Mutex<FeedQueue<S>>,
}

impl<S> Feed<S> {
    fn new(observer: SnapshotObserver<S>) -> Arc<Self> {
        Arc::new(Self {
            observer,
            queue: Mutex::new(FeedQueue {
                events: VecDeque::new(),
                draining: false,
                closed: false,
            }),
        })
    }

    fn queue(&self) -> MutexGuard<'_, FeedQueue<S>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Must be called under the store lock so queue order is snapshot order.
    fn push(&self, event: Result<S, UpstreamError>) {
        let mut queue = self.queue();
        if !queue.closed {
            queue.events.push_back(event);
        }
    }

    /// Deliver queued events unless another caller (or an outer frame of
    /// this one) is already draining; that drainer picks them up.
    fn drain(&self) {
        {
            let mut queue = self.queue();
            if queue.draining {
                return;
            }
            queue.draining = true;
        }
        loop {
            let event = {
                let mut queue = self.queue();
                match queue.events.pop_front() {
                    Some(event) => event,
                    None => {
                        queue.draining = false;
                        return;
                    }
                }
            };
            (self.observer)(event);
        }
    }

    fn close(&self) {
        let mut queue = self.queue();
        queue.closed = true;
        queue.events.clear();
    }
}

enum Delivery {
    Query {
        listener: u64,
        feed: Arc<Feed<Vec<DocumentSnapshot>>>,
        event: Result<Vec<DocumentSnapshot>, UpstreamError>,
    },
    Document {
        listener: u64,
        feed: Arc<Feed<DocumentSnapshot>>,
        event: Result<DocumentSnapshot, UpstreamError>,
    },
}

impl Delivery {
    fn listener(&self) -> u64 {
        match self {
            Self::Query { listener, .. } | Self::Document { listener, .. } => *listener,
        }
    }

    fn enqueue(self) -> Wake {
        match self {
            Self::Query { feed, event, .. } => {
                feed.push(event);
                Wake::Query(feed)
            }
            Self::Document { feed, event, .. } => {
                feed.push(event);
                Wake::Document(feed)
            }
        }
    }
}

/// A feed with freshly queued events, drained once the store lock is released.
enum Wake {
    Query(Arc<Feed<Vec<DocumentSnapshot>>>),
    Document(Arc<Feed<DocumentSnapshot>>),
}

impl Wake {
    fn drain(self) {
        match self {
            Self::Query(feed) => feed.drain(),
            Self::Document(feed) => feed.drain(),
        }
    }
}

fn wake_all(wakes: Vec<Wake>) {
    for wake in wakes {
        wake.drain();
    }
}

struct QueryListener {
    query: CollectionQuery,
    feed: Arc<Feed<Vec<DocumentSnapshot>>>,
}

struct DocumentListener {
    reference: DocumentRef,
    feed: Arc<Feed<DocumentSnapshot>>,
}

#[derive(Default)]
struct StoreInner {
    collections: BTreeMap<String, BTreeMap<String, DocumentData>>,
    query_listeners: BTreeMap<u64, QueryListener>,
    document_listeners: BTreeMap<u64, DocumentListener>,
    denied: BTreeMap<String, UpstreamError>,
    mode: DeliveryMode,
    pending: Vec<Delivery>,
    last_stamp: Option<DateTime<Utc>>,
}

impl StoreInner {
    fn query_snapshot(&self, query: &CollectionQuery) -> Vec<DocumentSnapshot> {
        self.collections
            .get(&query.path)
            .map(|documents| evaluate(query, documents))
            .unwrap_or_default()
    }

    fn document_snapshot(&self, reference: &DocumentRef) -> DocumentSnapshot {
        let data = self
            .collections
            .get(reference.collection_path())
            .and_then(|documents| documents.get(reference.id()))
            .cloned();
        DocumentSnapshot::new(reference.path.clone(), data)
    }

    fn is_registered(&self, listener: u64) -> bool {
        self.query_listeners.contains_key(&listener)
            || self.document_listeners.contains_key(&listener)
    }

    /// Strictly increasing server timestamp, RFC 3339 with microseconds so
    /// string order matches time order.
    fn next_timestamp(&mut self) -> Value {
        let mut now = Utc::now().trunc_subsecs(6);
        if let Some(last) = self.last_stamp {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_stamp = Some(now);
        Value::String(now.to_rfc3339_opts(SecondsFormat::Micros, true))
    }

    /// Deliveries for every listener affected by a write to `collection/doc_id`.
    fn deliveries_for(&self, collection: &str, doc_path: &str) -> Vec<Delivery> {
        let queries = self
            .query_listeners
            .iter()
            .filter(|(_, listener)| listener.query.path == collection)
            .map(|(id, listener)| Delivery::Query {
                listener: *id,
                feed: Arc::clone(&listener.feed),
                event: Ok(self.query_snapshot(&listener.query)),
            });
        let documents = self
            .document_listeners
            .iter()
            .filter(|(_, listener)| listener.reference.path == doc_path)
            .map(|(id, listener)| Delivery::Document {
                listener: *id,
                feed: Arc::clone(&listener.feed),
                event: Ok(self.document_snapshot(&listener.reference)),
            });
        queries.chain(documents).collect()
    }

    /// Queue `deliveries` on their feeds, or hold them for `flush` in manual
    /// mode. Returns the feeds to drain after the lock is released.
    fn route(&mut self, deliveries: Vec<Delivery>) -> Vec<Wake> {
        match self.mode {
            DeliveryMode::Immediate => deliveries.into_iter().map(Delivery::enqueue).collect(),
            DeliveryMode::Manual => {
                self.pending.extend(deliveries);
                Vec::new()
            }
        }
    }
}

fn lock(inner: &Mutex<StoreInner>) -> MutexGuard<'_, StoreInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory implementation of [`LiveQuerySource`] and [`DocumentWriter`].
pub struct MemoryStore {
    inner: Arc<Mutex<StoreInner>>,
    mode: DeliveryMode,
    next_listener_id: AtomicU64,
    listen_calls: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Store with immediate delivery.
    pub fn new() -> Self {
        Self::with_mode(DeliveryMode::Immediate)
    }

    /// Store with the given delivery mode.
    pub fn with_mode(mode: DeliveryMode) -> Self {
        let inner = StoreInner {
            mode,
            ..StoreInner::default()
        };
        Self {
            inner: Arc::new(Mutex::new(inner)),
            mode,
            next_listener_id: AtomicU64::new(0),
            listen_calls: AtomicUsize::new(0),
        }
    }

    /// Build a store from `{ "collection/path": { "docId": { fields } } }`.
    pub fn from_fixture(fixture: &Value) -> Result<Self, UpstreamError> {
        let store = Self::new();
        let collections = fixture.as_object().ok_or_else(|| {
            UpstreamError::invalid_argument("fixture must be an object keyed by collection path")
        })?;

        for (collection, documents) in collections {
            let documents = documents.as_object().ok_or_else(|| {
                UpstreamError::invalid_argument(format!(
                    "collection '{collection}' must map document ids to objects"
                ))
            })?;
            for (doc_id, data) in documents {
                let data = data.as_object().cloned().ok_or_else(|| {
                    UpstreamError::invalid_argument(format!(
                        "document '{collection}/{doc_id}' must be an object"
                    ))
                })?;
                store.seed(collection, doc_id, data);
            }
        }
        Ok(store)
    }

    /// Delivery mode chosen at construction.
    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    /// Number of listen calls served so far.
    pub fn listen_calls(&self) -> usize {
        self.listen_calls.load(Ordering::SeqCst)
    }

    /// Number of listeners currently attached.
    pub fn open_listeners(&self) -> usize {
        let inner = lock(&self.inner);
        inner.query_listeners.len() + inner.document_listeners.len()
    }

    /// Deliveries waiting for [`flush`](Self::flush).
    pub fn pending_deliveries(&self) -> usize {
        lock(&self.inner).pending.len()
    }

    /// Store a document verbatim (no timestamps) and notify listeners.
    pub fn seed(&self, collection: &str, doc_id: &str, data: DocumentData) {
        let wakes = {
            let mut inner = lock(&self.inner);
            inner
                .collections
                .entry(collection.to_string())
                .or_default()
                .insert(doc_id.to_string(), data);
            let deliveries = inner.deliveries_for(collection, &format!("{collection}/{doc_id}"));
            inner.route(deliveries)
        };
        wake_all(wakes);
    }

    /// Make every new listener on `path` receive `error` as its first event,
    /// the way a rules rejection surfaces on a fresh listener.
    pub fn deny_path(&self, path: &str, error: UpstreamError) {
        lock(&self.inner).denied.insert(path.to_string(), error);
    }

    /// Undo [`deny_path`](Self::deny_path).
    pub fn allow_path(&self, path: &str) {
        lock(&self.inner).denied.remove(path);
    }

    /// Deliver `error` to every listener on `path` (a collection or a document path).
    pub fn emit_error(&self, path: &str, error: UpstreamError) {
        let (listeners, wakes) = {
            let mut inner = lock(&self.inner);
            let queries = inner
                .query_listeners
                .iter()
                .filter(|(_, listener)| listener.query.path == path)
                .map(|(id, listener)| Delivery::Query {
                    listener: *id,
                    feed: Arc::clone(&listener.feed),
                    event: Err(error.clone()),
                });
            let documents = inner
                .document_listeners
                .iter()
                .filter(|(_, listener)| listener.reference.path == path)
                .map(|(id, listener)| Delivery::Document {
                    listener: *id,
                    feed: Arc::clone(&listener.feed),
                    event: Err(error.clone()),
                });
            let deliveries: Vec<_> = queries.chain(documents).collect();
            (deliveries.len(), inner.route(deliveries))
        };
        tracing::debug!(path, listeners, code = %error.code, "injecting listener error");
        wake_all(wakes);
    }

    /// Run every queued delivery whose listener is still attached.
    ///
    /// Returns the number delivered.
    pub fn flush(&self) -> usize {
        let wakes: Vec<_> = {
            let mut inner = lock(&self.inner);
            let pending = std::mem::take(&mut inner.pending);
            pending
                .into_iter()
                .filter(|delivery| inner.is_registered(delivery.listener()))
                .map(Delivery::enqueue)
                .collect()
        };
        let delivered = wakes.len();
        wake_all(wakes);
        delivered
    }

    fn detach(inner: &Weak<Mutex<StoreInner>>, listener: u64) -> ListenerRegistration {
        let inner = inner.clone();
        ListenerRegistration::new(move || {
            let Some(inner) = inner.upgrade() else {
                return;
            };
            let mut inner = lock(&inner);
            if let Some(removed) = inner.query_listeners.remove(&listener) {
                removed.feed.close();
            }
            if let Some(removed) = inner.document_listeners.remove(&listener) {
                removed.feed.close();
            }
        })
    }

    fn write(
        &self,
        collection: &str,
        doc_id: &str,
        apply: impl FnOnce(Option<&mut DocumentData>, Value) -> Result<Option<DocumentData>, UpstreamError>,
    ) -> Result<(), UpstreamError> {
        if collection.is_empty() {
            return Err(UpstreamError::invalid_argument("collection path is required"));
        }
        if doc_id.is_empty() {
            return Err(UpstreamError::invalid_argument("document id is required"));
        }

        let wakes = {
            let mut inner = lock(&self.inner);
            let stamp = inner.next_timestamp();
            let documents = inner.collections.entry(collection.to_string()).or_default();
            if let Some(replacement) = apply(documents.get_mut(doc_id), stamp)? {
                documents.insert(doc_id.to_string(), replacement);
            }
            let deliveries = inner.deliveries_for(collection, &format!("{collection}/{doc_id}"));
            inner.route(deliveries)
        };
        wake_all(wakes);
        Ok(())
    }
}

impl LiveQuerySource for MemoryStore {
    fn listen_query(
        &self,
        query: CollectionQuery,
        observer: SnapshotObserver<Vec<DocumentSnapshot>>,
    ) -> ListenerRegistration {
        self.listen_calls.fetch_add(1, Ordering::SeqCst);
        let listener = self.next_listener_id.fetch_add(1, Ordering::SeqCst);

        let wakes = {
            let mut inner = lock(&self.inner);
            let event = match inner.denied.get(&query.path) {
                Some(error) => Err(error.clone()),
                None => Ok(inner.query_snapshot(&query)),
            };
            let feed = Feed::new(observer);
            inner.query_listeners.insert(
                listener,
                QueryListener {
                    query,
                    feed: Arc::clone(&feed),
                },
            );
            inner.route(vec![Delivery::Query {
                listener,
                feed,
                event,
            }])
        };
        wake_all(wakes);

        Self::detach(&Arc::downgrade(&self.inner), listener)
    }

    fn listen_document(
        &self,
        reference: DocumentRef,
        observer: SnapshotObserver<DocumentSnapshot>,
    ) -> ListenerRegistration {
        self.listen_calls.fetch_add(1, Ordering::SeqCst);
        let listener = self.next_listener_id.fetch_add(1, Ordering::SeqCst);

        let wakes = {
            let mut inner = lock(&self.inner);
            let event = match inner.denied.get(&reference.path) {
                Some(error) => Err(error.clone()),
                None => Ok(inner.document_snapshot(&reference)),
            };
            let feed = Feed::new(observer);
            inner.document_listeners.insert(
                listener,
                DocumentListener {
                    reference,
                    feed: Arc::clone(&feed),
                },
            );
            inner.route(vec![Delivery::Document {
                listener,
                feed,
                event,
            }])
        };
        wake_all(wakes);

        Self::detach(&Arc::downgrade(&self.inner), listener)
    }
}

#[async_trait]
impl DocumentWriter for MemoryStore {
    async fn add_document(
        &self,
        collection: &str,
        mut data: DocumentData,
    ) -> Result<DocumentRef, UpstreamError> {
        let doc_id = Uuid::new_v4().simple().to_string();
        self.write(collection, &doc_id, |_, stamp| {
            data.insert("createdAt".to_string(), stamp.clone());
            data.insert("updatedAt".to_string(), stamp);
            Ok(Some(data))
        })?;
        Ok(DocumentRef::child(collection, &doc_id))
    }

    async fn set_document(
        &self,
        collection: &str,
        doc_id: &str,
        mut data: DocumentData,
        merge: bool,
    ) -> Result<(), UpstreamError> {
        self.write(collection, doc_id, |existing, stamp| {
            data.insert("updatedAt".to_string(), stamp);
            match existing {
                Some(existing) if merge => {
                    existing.extend(data);
                    Ok(None)
                }
                _ => Ok(Some(data)),
            }
        })
    }

    async fn update_document(
        &self,
        collection: &str,
        doc_id: &str,
        mut data: DocumentData,
    ) -> Result<(), UpstreamError> {
        self.write(collection, doc_id, |existing, stamp| {
            let existing = existing.ok_or_else(|| {
                UpstreamError::not_found(format!("no document to update: {collection}/{doc_id}"))
            })?;
            data.insert("updatedAt".to_string(), stamp);
            existing.extend(data);
            Ok(None)
        })
    }

    async fn delete_document(&self, collection: &str, doc_id: &str) -> Result<(), UpstreamError> {
        if collection.is_empty() || doc_id.is_empty() {
            return Err(UpstreamError::invalid_argument(
                "collection path and document id are required",
            ));
        }
        let wakes = {
            let mut inner = lock(&self.inner);
            let removed = inner
                .collections
                .get_mut(collection)
                .and_then(|documents| documents.remove(doc_id));
            if removed.is_none() {
                return Ok(());
            }
            let deliveries = inner.deliveries_for(collection, &format!("{collection}/{doc_id}"));
            inner.route(deliveries)
        };
        wake_all(wakes);
        Ok(())
    }
}
