use async_trait::async_trait;
use crate::document::{Document, DocumentPath, Fields, Query, WriteOp};
use crate::error::StoreError;

/// Collection-based document store
///
/// The only consistency assumption callers make is that a write is visible to
/// a later read issued through the same handle.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    // Backend metadata
    fn backend_name(&self) -> &str;

    // Reads
    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>, StoreError>;
    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError>;

    /// Apply every operation or none of them
    async fn commit(&self, batch: Vec<WriteOp>) -> Result<(), StoreError>;

    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.query(&Query::collection(collection)).await
    }

    async fn set(&self, path: &DocumentPath, data: Fields) -> Result<(), StoreError> {
        self.commit(vec![WriteOp::Set { path: path.clone(), data }]).await
    }

    async fn merge(&self, path: &DocumentPath, data: Fields) -> Result<(), StoreError> {
        self.commit(vec![WriteOp::Merge { path: path.clone(), data }]).await
    }

    async fn delete(&self, path: &DocumentPath) -> Result<(), StoreError> {
        self.commit(vec![WriteOp::Delete { path: path.clone() }]).await
    }
}
