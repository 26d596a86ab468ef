use crate::core::StoreResult;
use async_trait::async_trait;
use futures::stream::BoxStream;
use mongodb::bson::{Bson, Document};
use serde::Serialize;

/// Lazily-advanced cursor over matching documents
pub type DocumentCursor = BoxStream<'static, StoreResult<Document>>;

/// Store-side cursor shaping applied by [`DocumentStore::find`]
///
/// Applied in order: sort, skip, limit. A `limit` of zero means "no limit".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindSpec {
    pub sort: Option<Document>,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

/// Outcome of a single-document update or replace
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
}

/// One entry of a database listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseInfo {
    pub name: String,
    pub size_on_disk: u64,
    pub empty: bool,
}

/// Document store trait - allows pluggable store backends
///
/// Every method is one logical round trip. Implementations must be safe to
/// call concurrently from many tasks sharing one handle.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Count documents matching `filter`
    async fn count(&self, collection: &str, filter: Document) -> StoreResult<u64>;

    /// Open a cursor over documents matching `filter`
    async fn find(&self, collection: &str, filter: Document, spec: FindSpec) -> StoreResult<DocumentCursor>;

    /// First document matching `filter`
    async fn find_one(&self, collection: &str, filter: Document) -> StoreResult<Option<Document>>;

    /// Insert one document, returning its `_id` (generated when absent)
    async fn insert_one(&self, collection: &str, document: Document) -> StoreResult<Bson>;

    /// Insert a batch, returning how many documents were written
    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> StoreResult<u64>;

    /// Replace the first document matching `filter`
    async fn replace_one(&self, collection: &str, filter: Document, replacement: Document) -> StoreResult<UpdateOutcome>;

    /// Apply update operators to the first document matching `filter`
    async fn update_one(&self, collection: &str, filter: Document, update: Document) -> StoreResult<UpdateOutcome>;

    /// Delete the first document matching `filter`, returning the deleted count
    async fn delete_one(&self, collection: &str, filter: Document) -> StoreResult<u64>;

    /// Delete every document matching `filter`
    async fn delete_many(&self, collection: &str, filter: Document) -> StoreResult<u64>;

    /// Drop a collection; dropping a missing collection is not an error
    async fn drop_collection(&self, collection: &str) -> StoreResult<()>;

    /// Server build information
    async fn server_info(&self) -> StoreResult<Document>;

    /// Databases visible to this session
    async fn list_databases(&self) -> StoreResult<Vec<DatabaseInfo>>;

    /// Release pooled resources
    async fn shutdown(&self) -> StoreResult<()> {
        Ok(())
    }
}
