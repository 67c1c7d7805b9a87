use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::debug;
use crate::document::{compare_values, validate_collection, Direction, Document, DocumentPath, Fields, Query, WriteOp};
use crate::error::StoreError;
use crate::traits::DocumentStore;

/// Whole store contents: collection path -> document id -> fields
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub(crate) struct StoreState {
    #[serde(default)]
    collections: HashMap<String, BTreeMap<String, Fields>>,
}

impl StoreState {
    pub(crate) fn get(&self, path: &DocumentPath) -> Option<Document> {
        self.collections
            .get(&path.collection)
            .and_then(|docs| docs.get(&path.id))
            .map(|data| Document::new(path.id.clone(), data.clone()))
    }

    pub(crate) fn query(&self, query: &Query) -> Vec<Document> {
        let Some(docs) = self.collections.get(&query.collection) else {
            return Vec::new();
        };

        let mut matched: Vec<Document> = docs
            .iter()
            .filter(|(_, data)| query.filters.iter().all(|f| f.matches(data)))
            .map(|(id, data)| Document::new(id.clone(), data.clone()))
            .collect();

        // BTreeMap iteration already yields id order; sort_by is stable so ties keep it
        if let Some(order) = &query.order_by {
            matched.sort_by(|a, b| {
                let ord = compare_values(a.data.get(&order.field), b.data.get(&order.field));
                match order.direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }

        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }
        matched
    }

    /// Validate every path, then apply all operations in order
    pub(crate) fn apply_batch(&mut self, batch: Vec<WriteOp>) -> Result<(), StoreError> {
        for op in &batch {
            op.path().validate()?;
        }
        // Apply to a copy so a failing operation leaves the state untouched
        let mut next = self.clone();
        for op in batch {
            next.apply(op)?;
        }
        *self = next;
        Ok(())
    }

    fn apply(&mut self, op: WriteOp) -> Result<(), StoreError> {
        match op {
            WriteOp::Set { path, data } => {
                self.collections.entry(path.collection).or_default().insert(path.id, data);
            }
            WriteOp::Merge { path, data } => {
                let doc = self
                    .collections
                    .entry(path.collection)
                    .or_default()
                    .entry(path.id)
                    .or_default();
                for (key, value) in data {
                    doc.insert(key, value);
                }
            }
            WriteOp::Delete { path } => {
                if let Some(docs) = self.collections.get_mut(&path.collection) {
                    docs.remove(&path.id);
                    if docs.is_empty() {
                        self.collections.remove(&path.collection);
                    }
                }
            }
            WriteOp::ArrayUnion { path, field, value } => {
                let display = path.to_string();
                let doc = self
                    .collections
                    .entry(path.collection)
                    .or_default()
                    .entry(path.id)
                    .or_default();
                match doc.entry(field.clone()).or_insert_with(|| Value::Array(Vec::new())) {
                    Value::Array(items) => {
                        if !items.contains(&value) {
                            items.push(value);
                        }
                    }
                    _ => {
                        return Err(StoreError::InvalidDocument(format!(
                            "{}: field '{}' is not an array",
                            display, field
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    pub(crate) fn document_count(&self) -> usize {
        self.collections.values().map(|docs| docs.len()).sum()
    }
}

/// Process-local store; contents are lost when dropped
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn document_count(&self) -> usize {
        self.state.read().await.document_count()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend_name(&self) -> &str {
        "memory"
    }

    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>, StoreError> {
        path.validate()?;
        Ok(self.state.read().await.get(path))
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        validate_collection(&query.collection)?;
        let docs = self.state.read().await.query(query);
        debug!("memory query {}: {} documents", query.collection, docs.len());
        Ok(docs)
    }

    async fn commit(&self, batch: Vec<WriteOp>) -> Result<(), StoreError> {
        let size = batch.len();
        self.state.write().await.apply_batch(batch)?;
        debug!("memory commit: {} operations", size);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryStore::new();
        let path = DocumentPath::new("movies", "m1");
        store.set(&path, fields(json!({ "title": "Heat" }))).await.unwrap();

        let doc = store.get(&path).await.unwrap().unwrap();
        assert_eq!(doc.id, "m1");
        assert_eq!(doc.data["title"], "Heat");

        store.delete(&path).await.unwrap();
        assert!(store.get(&path).await.unwrap().is_none());
        // Deleting again is a no-op
        store.delete(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_merge_keeps_existing_fields() {
        let store = MemoryStore::new();
        let path = DocumentPath::new("users/u1/progress", "m1");
        store.set(&path, fields(json!({ "currentTime": 10.0, "duration": 100.0 }))).await.unwrap();
        store.merge(&path, fields(json!({ "completed": true }))).await.unwrap();

        let doc = store.get(&path).await.unwrap().unwrap();
        assert_eq!(doc.data["currentTime"], 10.0);
        assert_eq!(doc.data["completed"], true);
    }

    #[tokio::test]
    async fn test_query_filters_order_and_limit() {
        let store = MemoryStore::new();
        for (id, number, genres) in [("a", 3, vec!["Drama"]), ("b", 1, vec!["Drama", "Crime"]), ("c", 2, vec!["Crime"])] {
            store
                .set(&DocumentPath::new("movies", id), fields(json!({ "number": number, "genres": genres })))
                .await
                .unwrap();
        }

        let drama = store
            .query(&Query::collection("movies").where_array_contains("genres", "Drama"))
            .await
            .unwrap();
        assert_eq!(drama.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);

        let ordered = store
            .query(&Query::collection("movies").order_by("number", Direction::Ascending).limit(2))
            .await
            .unwrap();
        assert_eq!(ordered.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(), vec!["b", "c"]);

        let missing = store.query(&Query::collection("series")).await.unwrap();
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn test_array_union_is_idempotent() {
        let store = MemoryStore::new();
        let path = DocumentPath::new("users", "u1");
        let entry = json!({ "seriesId": "s1" });
        for _ in 0..2 {
            store
                .commit(vec![WriteOp::ArrayUnion { path: path.clone(), field: "watching".into(), value: entry.clone() }])
                .await
                .unwrap();
        }
        let doc = store.get(&path).await.unwrap().unwrap();
        assert_eq!(doc.data["watching"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_batch_applies_nothing() {
        let store = MemoryStore::new();
        let user = DocumentPath::new("users", "u1");
        store.set(&user, fields(json!({ "watching": "oops" }))).await.unwrap();

        let result = store
            .commit(vec![
                WriteOp::Set { path: DocumentPath::new("series", "s1"), data: fields(json!({ "title": "Dark" })) },
                WriteOp::ArrayUnion { path: user.clone(), field: "watching".into(), value: json!(1) },
            ])
            .await;
        assert!(result.is_err());
        assert!(store.get(&DocumentPath::new("series", "s1")).await.unwrap().is_none());

        let bad_path = store
            .commit(vec![WriteOp::Delete { path: DocumentPath::new("users/u1", "x") }])
            .await;
        assert!(matches!(bad_path, Err(StoreError::InvalidPath(_))));
    }
}
