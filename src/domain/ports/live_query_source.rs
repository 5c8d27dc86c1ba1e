//! Realtime read port for the hosted document database.

use std::sync::Arc;

use crate::domain::errors::UpstreamError;
use crate::domain::models::{CollectionQuery, DocumentRef, DocumentSnapshot};

/// Callback the upstream invokes with each snapshot or listener error.
///
/// Implementations must deliver events for one registration serially.
pub type SnapshotObserver<S> = Arc<dyn Fn(Result<S, UpstreamError>) + Send + Sync>;

/// Handle to an open upstream listener.
///
/// Dropping the handle does not detach; call [`ListenerRegistration::remove`].
#[must_use = "an upstream listener stays open until `remove` is called"]
pub struct ListenerRegistration {
    detach: Box<dyn FnOnce() + Send>,
}

impl ListenerRegistration {
    /// Registration that runs `detach` on removal.
    pub fn new(detach: impl FnOnce() + Send + 'static) -> Self {
        Self {
            detach: Box::new(detach),
        }
    }

    /// Detach the upstream listener.
    pub fn remove(self) {
        (self.detach)();
    }
}

impl std::fmt::Debug for ListenerRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistration").finish_non_exhaustive()
    }
}

/// Realtime capability of the hosted document database.
///
/// Each call opens one live listener that keeps delivering snapshots (or
/// errors) to `observer` until the returned registration is removed.
/// Retry and reconnect policy belongs to the implementation.
pub trait LiveQuerySource: Send + Sync {
    /// Listen to the ordered result set of `query`.
    fn listen_query(
        &self,
        query: CollectionQuery,
        observer: SnapshotObserver<Vec<DocumentSnapshot>>,
    ) -> ListenerRegistration;

    /// Listen to a single document; a missing document is delivered as a
    /// snapshot whose `data` is `None`.
    fn listen_document(
        &self,
        reference: DocumentRef,
        observer: SnapshotObserver<DocumentSnapshot>,
    ) -> ListenerRegistration;
}
