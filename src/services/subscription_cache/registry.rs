//! Keyed registry of shared upstream listeners.
//!
//! One `Registry` backs each cardinality (collections and documents). An
//! entry owns at most one upstream registration and an ordered set of
//! listener records. State changes are fanned out over a snapshot of the
//! listener set taken under the entry lock and delivered after the lock is
//! released, so listeners may subscribe, unsubscribe or clear from inside
//! their own callback.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::domain::errors::UpstreamError;
use crate::domain::models::DocumentSnapshot;
use crate::domain::ports::{ListenerRegistration, SnapshotObserver};

/// Recover the guard from a poisoned lock; entry state stays consistent
/// because no callback ever runs while an entry lock is held.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Payload an entry holds between upstream events.
pub(crate) trait EntrySnapshot: Default + Send + Sync + 'static {
    fn record_count(&self) -> usize;
}

impl EntrySnapshot for Vec<DocumentSnapshot> {
    fn record_count(&self) -> usize {
        self.len()
    }
}

impl EntrySnapshot for Option<DocumentSnapshot> {
    fn record_count(&self) -> usize {
        usize::from(self.as_ref().is_some_and(DocumentSnapshot::exists))
    }
}

/// Full entry state handed to every listener on every change.
pub(crate) struct RawState<S> {
    pub snapshot: Arc<S>,
    pub loading: bool,
    pub error: Option<UpstreamError>,
    version: u64,
}

impl<S> Clone for RawState<S> {
    fn clone(&self) -> Self {
        Self {
            snapshot: Arc::clone(&self.snapshot),
            loading: self.loading,
            error: self.error.clone(),
            version: self.version,
        }
    }
}

pub(crate) type Notify<S> = Box<dyn Fn(&RawState<S>) + Send + Sync>;
pub(crate) type Factory<D> = Arc<dyn Fn() -> D + Send + Sync>;

struct ListenerRecord<S> {
    active: AtomicBool,
    /// `version + 1` of the last state delivered, 0 before the first.
    seen: AtomicU64,
    notify: Notify<S>,
}

impl<S> ListenerRecord<S> {
    fn deliver(&self, state: &RawState<S>) {
        if !self.active.load(Ordering::Acquire) {
            return;
        }
        let stamp = state.version + 1;
        if self.seen.fetch_max(stamp, Ordering::AcqRel) >= stamp {
            return;
        }
        (self.notify)(state);
    }
}

enum Upstream {
    Idle,
    Opening,
    Open(ListenerRegistration),
}

struct EntryInner<D, S> {
    state: RawState<S>,
    listeners: BTreeMap<u64, Arc<ListenerRecord<S>>>,
    upstream: Upstream,
    factory: Factory<D>,
    cleared: bool,
}

pub(crate) struct Entry<D, S> {
    key: String,
    kind: &'static str,
    inner: Mutex<EntryInner<D, S>>,
}

impl<D, S: EntrySnapshot> Entry<D, S> {
    fn new(key: &str, kind: &'static str, factory: Factory<D>) -> Self {
        Self {
            key: key.to_string(),
            kind,
            inner: Mutex::new(EntryInner {
                state: RawState {
                    snapshot: Arc::new(S::default()),
                    loading: true,
                    error: None,
                    version: 0,
                },
                listeners: BTreeMap::new(),
                upstream: Upstream::Idle,
                factory,
                cleared: false,
            }),
        }
    }

    fn apply(&self, event: Result<S, UpstreamError>) {
        let (state, listeners) = {
            let mut inner = lock(&self.inner);
            if inner.cleared {
                return;
            }
            match event {
                Ok(snapshot) => {
                    tracing::debug!(
                        kind = self.kind,
                        key = %self.key,
                        records = snapshot.record_count(),
                        "snapshot received"
                    );
                    inner.state.snapshot = Arc::new(snapshot);
                    inner.state.error = None;
                }
                Err(error) => {
                    tracing::warn!(kind = self.kind, key = %self.key, %error, "upstream listener error");
                    inner.state.error = Some(error);
                }
            }
            inner.state.loading = false;
            inner.state.version += 1;
            let listeners: Vec<_> = inner.listeners.values().cloned().collect();
            (inner.state.clone(), listeners)
        };

        for listener in listeners {
            listener.deliver(&state);
        }
    }
}

/// Detaches one listener from its entry.
pub(crate) struct ListenerHandle<D, S> {
    entry: Weak<Entry<D, S>>,
    id: u64,
}

impl<D, S> ListenerHandle<D, S> {
    pub fn detach(self) {
        let Some(entry) = self.entry.upgrade() else {
            return;
        };
        let removed = lock(&entry.inner).listeners.remove(&self.id);
        if let Some(record) = removed {
            record.active.store(false, Ordering::Release);
        }
    }
}

/// Counters for one registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RegistryStats {
    pub entries: usize,
    pub listeners: usize,
    pub open_upstreams: usize,
}

pub(crate) struct Registry<D, S> {
    kind: &'static str,
    entries: Mutex<HashMap<String, Arc<Entry<D, S>>>>,
    next_listener_id: AtomicU64,
}

impl<D, S> Registry<D, S>
where
    D: 'static,
    S: EntrySnapshot,
{
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: Mutex::new(HashMap::new()),
            next_listener_id: AtomicU64::new(0),
        }
    }

    /// Register `notify` against `key`, opening the upstream listener
    /// through `open` if the entry has none.
    ///
    /// `notify` receives the current state before this returns.
    pub fn subscribe<O>(
        &self,
        key: &str,
        factory: Factory<D>,
        open: O,
        notify: Notify<S>,
    ) -> ListenerHandle<D, S>
    where
        O: Fn(D, SnapshotObserver<S>) -> ListenerRegistration,
    {
        let record = Arc::new(ListenerRecord {
            active: AtomicBool::new(true),
            seen: AtomicU64::new(0),
            notify,
        });

        loop {
            let entry = self.ensure_open(key, Arc::clone(&factory), &open);
            let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);

            let state = {
                let mut inner = lock(&entry.inner);
                if inner.cleared {
                    // Cleared between open and attach; start over on a fresh entry.
                    continue;
                }
                inner.listeners.insert(id, Arc::clone(&record));
                inner.state.clone()
            };

            record.deliver(&state);
            return ListenerHandle {
                entry: Arc::downgrade(&entry),
                id,
            };
        }
    }

    fn ensure_open<O>(&self, key: &str, factory: Factory<D>, open: &O) -> Arc<Entry<D, S>>
    where
        O: Fn(D, SnapshotObserver<S>) -> ListenerRegistration,
    {
        let (entry, opening) = {
            let mut entries = lock(&self.entries);
            let entry = entries
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Entry::new(key, self.kind, Arc::clone(&factory))))
                .clone();

            let mut inner = lock(&entry.inner);
            inner.factory = factory;
            let opening = match inner.upstream {
                Upstream::Idle => {
                    inner.upstream = Upstream::Opening;
                    Some(Arc::clone(&inner.factory))
                }
                Upstream::Opening | Upstream::Open(_) => None,
            };
            drop(inner);
            (entry, opening)
        };

        if let Some(factory) = opening {
            tracing::debug!(kind = self.kind, key = %key, "opening upstream listener");
            let weak = Arc::downgrade(&entry);
            let observer: SnapshotObserver<S> = Arc::new(move |event: Result<S, UpstreamError>| {
                if let Some(entry) = weak.upgrade() {
                    entry.apply(event);
                }
            });
            let registration = open(factory(), observer);

            let mut inner = lock(&entry.inner);
            if !inner.cleared && matches!(inner.upstream, Upstream::Opening) {
                inner.upstream = Upstream::Open(registration);
            } else {
                drop(inner);
                registration.remove();
            }
        }

        entry
    }

    /// Tear down every upstream listener, drop all listeners without
    /// notifying them and empty the registry.
    ///
    /// Returns the number of upstream listeners closed.
    pub fn clear(&self) -> usize {
        let drained: Vec<_> = lock(&self.entries).drain().map(|(_, entry)| entry).collect();

        let mut registrations = Vec::new();
        // Records own caller closures, which may own `Subscription`s on the
        // same entry; they are dropped only after every entry lock is released.
        let mut records = Vec::new();
        for entry in &drained {
            let mut inner = lock(&entry.inner);
            inner.cleared = true;
            let listeners = std::mem::take(&mut inner.listeners);
            for record in listeners.values() {
                record.active.store(false, Ordering::Release);
            }
            records.push(listeners);
            if let Upstream::Open(registration) =
                std::mem::replace(&mut inner.upstream, Upstream::Idle)
            {
                registrations.push(registration);
            }
        }

        let closed = registrations.len();
        for registration in registrations {
            registration.remove();
        }
        drop(records);
        drop(drained);
        closed
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = lock(&self.entries).keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn listener_count(&self, key: &str) -> Option<usize> {
        let entry = lock(&self.entries).get(key).cloned()?;
        let count = lock(&entry.inner).listeners.len();
        Some(count)
    }

    pub fn stats(&self) -> RegistryStats {
        let entries: Vec<_> = lock(&self.entries).values().cloned().collect();
        let mut stats = RegistryStats {
            entries: entries.len(),
            ..RegistryStats::default()
        };
        for entry in entries {
            let inner = lock(&entry.inner);
            stats.listeners += inner.listeners.len();
            if matches!(inner.upstream, Upstream::Open(_)) {
                stats.open_upstreams += 1;
            }
        }
        stats
    }
}
