//! Document snapshots delivered by the live-query capability.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field map of a stored document.
pub type DocumentData = Map<String, Value>;

/// Point-in-time view of one stored document.
///
/// `data` is `None` when the referenced document does not exist; query
/// snapshots only ever carry existing documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    /// Last path segment.
    pub id: String,
    /// Full document path.
    pub path: String,
    /// Fields, `None` when the document does not exist.
    pub data: Option<DocumentData>,
}

impl DocumentSnapshot {
    /// Snapshot of `path`; the id is its last segment.
    pub fn new(path: impl Into<String>, data: Option<DocumentData>) -> Self {
        let path = path.into();
        let id = path.rsplit('/').next().unwrap_or_default().to_string();
        Self { id, path, data }
    }

    /// Whether the document exists.
    pub fn exists(&self) -> bool {
        self.data.is_some()
    }

    /// Top-level field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.as_ref().and_then(|data| data.get(field))
    }

    /// Flatten into `{ "id": ..., ...fields }`.
    ///
    /// A stored `id` field wins over the document id, matching how the
    /// records are spread on the consumer side.
    pub fn to_record(&self) -> Option<Value> {
        let data = self.data.as_ref()?;
        let mut record = Map::with_capacity(data.len() + 1);
        record.insert("id".to_string(), Value::String(self.id.clone()));
        for (field, value) in data {
            record.insert(field.clone(), value.clone());
        }
        Some(Value::Object(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: Value) -> Option<DocumentData> {
        value.as_object().cloned()
    }

    #[test]
    fn test_id_is_last_path_segment() {
        let snap = DocumentSnapshot::new("users/u1/workouts/w9", None);
        assert_eq!(snap.id, "w9");
        assert!(!snap.exists());
    }

    #[test]
    fn test_to_record_prepends_id() {
        let snap = DocumentSnapshot::new("exercises/bench", data(json!({"name": "Bench"})));
        assert_eq!(snap.to_record(), Some(json!({"id": "bench", "name": "Bench"})));
    }

    #[test]
    fn test_to_record_stored_id_overrides() {
        let snap = DocumentSnapshot::new("exercises/bench", data(json!({"id": "legacy"})));
        assert_eq!(snap.to_record(), Some(json!({"id": "legacy"})));
    }

    #[test]
    fn test_to_record_missing_document() {
        let snap = DocumentSnapshot::new("exercises/none", None);
        assert_eq!(snap.to_record(), None);
    }
}
