//! Store-level value types: documents, paths, queries and write operations
//!
//! Documents are schemaless JSON objects at this layer; typed decoding
//! happens through [`Document::decode`] at the data-access boundary.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt;
use crate::error::StoreError;

pub type Fields = Map<String, Value>;

/// A stored document: its id within the collection plus its fields
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, data: Fields) -> Self {
        Self { id: id.into(), data }
    }

    /// Decode into a typed record, injecting the document id as `id` when the
    /// fields do not carry one
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        let mut data = self.data.clone();
        let has_id = matches!(data.get("id"), Some(Value::String(s)) if !s.is_empty());
        if !has_id {
            data.insert("id".to_string(), Value::String(self.id.clone()));
        }
        serde_json::from_value(Value::Object(data)).map_err(|e| StoreError::Decode {
            id: self.id.clone(),
            message: e.to_string(),
        })
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }
}

/// Serialize a typed record into store fields
pub fn to_fields<T: Serialize>(value: &T) -> Result<Fields, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::InvalidDocument(format!(
            "expected an object, got {}",
            other
        ))),
    }
}

/// Full path of one document: `collection/segments/.../id`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentPath {
    pub collection: String,
    pub id: String,
}

impl DocumentPath {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Parse `a/b/c/d` into collection `a/b/c` and id `d`
    pub fn parse(path: &str) -> Result<Self, StoreError> {
        let (collection, id) = path
            .rsplit_once('/')
            .ok_or_else(|| StoreError::InvalidPath(path.to_string()))?;
        let parsed = Self::new(collection, id);
        parsed.validate()?;
        Ok(parsed)
    }

    /// Collection paths have an odd number of non-empty segments, ids contain no '/'
    pub fn validate(&self) -> Result<(), StoreError> {
        validate_collection(&self.collection)?;
        if self.id.is_empty() || self.id.contains('/') {
            return Err(StoreError::InvalidPath(self.to_string()));
        }
        Ok(())
    }

    /// Path of a subcollection under this document
    pub fn child(&self, name: &str) -> String {
        format!("{}/{}/{}", self.collection, self.id, name)
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

pub fn validate_collection(collection: &str) -> Result<(), StoreError> {
    let segments: Vec<&str> = collection.split('/').collect();
    if segments.iter().any(|s| s.is_empty()) || segments.len() % 2 == 0 {
        return Err(StoreError::InvalidPath(collection.to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Field equals the value
    Eq(String, Value),
    /// Field is an array containing the value
    ArrayContains(String, Value),
}

impl Filter {
    pub fn matches(&self, data: &Fields) -> bool {
        match self {
            Filter::Eq(field, value) => data.get(field) == Some(value),
            Filter::ArrayContains(field, value) => match data.get(field) {
                Some(Value::Array(items)) => items.contains(value),
                _ => false,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Filtered read over one collection
///
/// Without an explicit ordering, results come back ordered by document id.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn where_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(field.to_string(), value.into()));
        self
    }

    pub fn where_array_contains(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::ArrayContains(field.to_string(), value.into()));
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.to_string(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Total order over JSON values used for `order_by`: missing < null < bool < number < string
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None => 0,
            Some(Value::Null) => 1,
            Some(Value::Bool(_)) => 2,
            Some(Value::Number(_)) => 3,
            Some(Value::String(_)) => 4,
            Some(Value::Array(_)) => 5,
            Some(Value::Object(_)) => 6,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// One write inside an atomic batch
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Create or replace the whole document
    Set { path: DocumentPath, data: Fields },
    /// Shallow-merge fields into the document, creating it if absent
    Merge { path: DocumentPath, data: Fields },
    /// Remove the document; missing documents are not an error
    Delete { path: DocumentPath },
    /// Append `value` to the array `field` unless an equal element is already present
    ArrayUnion { path: DocumentPath, field: String, value: Value },
}

impl WriteOp {
    pub fn path(&self) -> &DocumentPath {
        match self {
            WriteOp::Set { path, .. }
            | WriteOp::Merge { path, .. }
            | WriteOp::Delete { path }
            | WriteOp::ArrayUnion { path, .. } => path,
        }
    }
}
