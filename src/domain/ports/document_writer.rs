//! Write port for the hosted document database.

use async_trait::async_trait;

use crate::domain::errors::UpstreamError;
use crate::domain::models::{DocumentData, DocumentRef};

/// Write side of the hosted document database.
///
/// Writes never touch the subscription cache directly; open live listeners
/// observe them through their next snapshot.
#[async_trait]
pub trait DocumentWriter: Send + Sync {
    /// Create a document with a generated id in `collection`.
    ///
    /// Stamps `createdAt` and `updatedAt`.
    async fn add_document(
        &self,
        collection: &str,
        data: DocumentData,
    ) -> Result<DocumentRef, UpstreamError>;

    /// Create or overwrite `collection/doc_id`, merging fields when `merge`.
    ///
    /// Stamps `updatedAt`.
    async fn set_document(
        &self,
        collection: &str,
        doc_id: &str,
        data: DocumentData,
        merge: bool,
    ) -> Result<(), UpstreamError>;

    /// Merge fields into an existing document.
    ///
    /// # Errors
    /// Returns `not-found` if the document does not exist.
    async fn update_document(
        &self,
        collection: &str,
        doc_id: &str,
        data: DocumentData,
    ) -> Result<(), UpstreamError>;

    /// Delete `collection/doc_id`; deleting a missing document succeeds.
    async fn delete_document(&self, collection: &str, doc_id: &str) -> Result<(), UpstreamError>;
}
