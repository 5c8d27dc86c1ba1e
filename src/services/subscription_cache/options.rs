use std::sync::Arc;

use serde_json::Value;

use crate::domain::models::{CollectionQuery, DocumentRef, DocumentSnapshot};

/// Builds the query an entry listens to.
pub type QueryFactory = Arc<dyn Fn() -> CollectionQuery + Send + Sync>;
/// Builds the reference a document entry listens to.
pub type RefFactory = Arc<dyn Fn() -> DocumentRef + Send + Sync>;
/// Shapes one record of a collection snapshot.
pub type CollectionMapper<T> = Arc<dyn Fn(&DocumentSnapshot) -> T + Send + Sync>;
/// Shapes a document snapshot.
pub type DocumentMapper<T> = Arc<dyn Fn(Option<&DocumentSnapshot>) -> Option<T> + Send + Sync>;

/// How to (re)open a collection entry and how to shape its records.
///
/// The factory is kept by the entry; the most recent registration's factory
/// is the one used if the upstream listener is ever reopened.
pub struct CollectionOptions<T> {
    pub(crate) query_factory: QueryFactory,
    pub(crate) map: CollectionMapper<T>,
}

impl CollectionOptions<Value> {
    /// Options with the default `{ "id": .., ...fields }` mapper.
    pub fn new(query_factory: impl Fn() -> CollectionQuery + Send + Sync + 'static) -> Self {
        Self {
            query_factory: Arc::new(query_factory),
            map: Arc::new(|snapshot: &DocumentSnapshot| {
                snapshot.to_record().unwrap_or(Value::Null)
            }),
        }
    }

    /// Default-mapped options that always listen to `query`.
    pub fn for_query(query: CollectionQuery) -> Self {
        Self::new(move || query.clone())
    }
}

impl<T> CollectionOptions<T> {
    /// Replace the mapper applied to every record of every snapshot.
    pub fn map<U>(
        self,
        map: impl Fn(&DocumentSnapshot) -> U + Send + Sync + 'static,
    ) -> CollectionOptions<U> {
        CollectionOptions {
            query_factory: self.query_factory,
            map: Arc::new(map),
        }
    }
}

impl<T> Clone for CollectionOptions<T> {
    fn clone(&self) -> Self {
        Self {
            query_factory: Arc::clone(&self.query_factory),
            map: Arc::clone(&self.map),
        }
    }
}

/// Document counterpart of [`CollectionOptions`].
pub struct DocumentOptions<T> {
    pub(crate) ref_factory: RefFactory,
    pub(crate) map: DocumentMapper<T>,
}

impl DocumentOptions<Value> {
    /// Options with the default mapper: `None` for a missing document,
    /// `{ "id": .., ...fields }` otherwise.
    pub fn new(ref_factory: impl Fn() -> DocumentRef + Send + Sync + 'static) -> Self {
        Self {
            ref_factory: Arc::new(ref_factory),
            map: Arc::new(|snapshot: Option<&DocumentSnapshot>| {
                snapshot.and_then(DocumentSnapshot::to_record)
            }),
        }
    }

    /// Default-mapped options that always listen to `reference`.
    pub fn for_ref(reference: DocumentRef) -> Self {
        Self::new(move || reference.clone())
    }
}

impl<T> DocumentOptions<T> {
    /// Replace the document mapper.
    pub fn map<U>(
        self,
        map: impl Fn(Option<&DocumentSnapshot>) -> Option<U> + Send + Sync + 'static,
    ) -> DocumentOptions<U> {
        DocumentOptions {
            ref_factory: self.ref_factory,
            map: Arc::new(map),
        }
    }
}

impl<T> Clone for DocumentOptions<T> {
    fn clone(&self) -> Self {
        Self {
            ref_factory: Arc::clone(&self.ref_factory),
            map: Arc::clone(&self.map),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_collection_mapper() {
        let options = CollectionOptions::for_query(CollectionQuery::new("exercises"));
        let snapshot = DocumentSnapshot::new(
            "exercises/squat",
            json!({"name": "Squat"}).as_object().cloned(),
        );
        assert_eq!((options.map)(&snapshot), json!({"id": "squat", "name": "Squat"}));
        assert_eq!((options.query_factory)().path, "exercises");
    }

    #[test]
    fn test_default_document_mapper_handles_missing() {
        let options = DocumentOptions::for_ref(DocumentRef::new("users/u1"));
        assert_eq!((options.map)(None), None);
        assert_eq!((options.map)(Some(&DocumentSnapshot::new("users/u1", None))), None);
    }

    #[test]
    fn test_map_replaces_mapper() {
        let options = CollectionOptions::for_query(CollectionQuery::new("exercises"))
            .map(|snapshot| snapshot.id.to_uppercase());
        let snapshot = DocumentSnapshot::new("exercises/row", Some(Default::default()));
        assert_eq!((options.map)(&snapshot), "ROW");
    }
}
