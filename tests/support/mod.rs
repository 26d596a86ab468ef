//! Shared helpers for integration tests
//!
//! `InstrumentedStore` wraps a [`MemoryStore`], counts how many documents the
//! cursors hand out and can make a cursor fail after a fixed number of rows.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::StreamExt;
use mongo_adapter::bson::{Bson, Document, doc};
use mongo_adapter::storage::{DocumentCursor, FindSpec, UpdateOutcome};
use mongo_adapter::{Connection, DatabaseInfo, DocumentStore, MemoryStore, StoreError};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Clone, Default)]
pub struct InstrumentedStore {
    pub inner: MemoryStore,
    pulled: Arc<AtomicUsize>,
    fail_after: Option<usize>,
}

impl InstrumentedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursors yield `rows` documents, then an error
    pub fn failing_after(rows: usize) -> Self {
        Self {
            fail_after: Some(rows),
            ..Self::default()
        }
    }

    /// Documents handed out by cursors so far
    pub fn pulled(&self) -> usize {
        self.pulled.load(Ordering::SeqCst)
    }

    pub fn connection(&self) -> Connection {
        Connection::from_store(Arc::new(self.clone()))
    }
}

#[async_trait]
impl DocumentStore for InstrumentedStore {
    async fn count(&self, collection: &str, filter: Document) -> StoreResult<u64> {
        self.inner.count(collection, filter).await
    }

    async fn find(&self, collection: &str, filter: Document, spec: FindSpec) -> StoreResult<DocumentCursor> {
        let cursor = self.inner.find(collection, filter, spec).await?;
        let pulled = Arc::clone(&self.pulled);
        let cursor = cursor.inspect(move |_| {
            pulled.fetch_add(1, Ordering::SeqCst);
        });

        match self.fail_after {
            Some(rows) => {
                let failure = futures::stream::once(async {
                    Err::<Document, _>(StoreError::Other("cursor lost".to_string()))
                });
                Ok(cursor.take(rows).chain(failure).boxed())
            }
            None => Ok(cursor.boxed()),
        }
    }

    async fn find_one(&self, collection: &str, filter: Document) -> StoreResult<Option<Document>> {
        self.inner.find_one(collection, filter).await
    }

    async fn insert_one(&self, collection: &str, document: Document) -> StoreResult<Bson> {
        self.inner.insert_one(collection, document).await
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> StoreResult<u64> {
        self.inner.insert_many(collection, documents).await
    }

    async fn replace_one(&self, collection: &str, filter: Document, replacement: Document) -> StoreResult<UpdateOutcome> {
        self.inner.replace_one(collection, filter, replacement).await
    }

    async fn update_one(&self, collection: &str, filter: Document, update: Document) -> StoreResult<UpdateOutcome> {
        self.inner.update_one(collection, filter, update).await
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> StoreResult<u64> {
        self.inner.delete_one(collection, filter).await
    }

    async fn delete_many(&self, collection: &str, filter: Document) -> StoreResult<u64> {
        self.inner.delete_many(collection, filter).await
    }

    async fn drop_collection(&self, collection: &str) -> StoreResult<()> {
        self.inner.drop_collection(collection).await
    }

    async fn server_info(&self) -> StoreResult<Document> {
        self.inner.server_info().await
    }

    async fn list_databases(&self) -> StoreResult<Vec<DatabaseInfo>> {
        self.inner.list_databases().await
    }
}

/// Insert `{_id: n, n: n}` for `n` in `0..count`
pub async fn seed_numbers(store: &dyn DocumentStore, collection: &str, count: i32) {
    let documents = (0..count).map(|n| doc! { "_id": n, "n": n }).collect();
    store.insert_many(collection, documents).await.unwrap();
}
