//! MongoDB-backed [`DocumentStore`]
//!
//! Thin pass-through to the official async driver. The client owns the
//! connection pool; this type only picks the database and translates results.

use super::engine::{DatabaseInfo, DocumentCursor, DocumentStore, FindSpec, UpdateOutcome};
use crate::core::{StoreError, StoreResult};
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use mongodb::bson::{Bson, Document, doc};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, Database};
use std::time::Duration;

/// Database used when the connection string names none
const FALLBACK_DATABASE: &str = "test";

pub struct MongoStore {
    client: Client,
}

impl MongoStore {
    /// Connect and verify the server is reachable
    ///
    /// Returns only after a `ping` round trip succeeds, so unreachable servers
    /// and rejected credentials fail here rather than on first use.
    pub async fn connect(
        url: &str,
        app_name: Option<&str>,
        connect_timeout: Option<Duration>,
    ) -> StoreResult<Self> {
        let mut options = ClientOptions::parse(url).await?;
        if let Some(name) = app_name {
            options.app_name = Some(name.to_string());
        }
        if let Some(timeout) = connect_timeout {
            options.connect_timeout = Some(timeout);
            options.server_selection_timeout = Some(timeout);
        }

        let client = Client::with_options(options)?;
        let store = Self { client };
        store.database().run_command(doc! { "ping": 1 }).await?;
        Ok(store)
    }

    /// Wrap an already configured client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    fn database(&self) -> Database {
        self.client
            .default_database()
            .unwrap_or_else(|| self.client.database(FALLBACK_DATABASE))
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.database().collection(name)
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn count(&self, collection: &str, filter: Document) -> StoreResult<u64> {
        Ok(self.collection(collection).count_documents(filter).await?)
    }

    async fn find(&self, collection: &str, filter: Document, spec: FindSpec) -> StoreResult<DocumentCursor> {
        let collection = self.collection(collection);
        let mut find = collection.find(filter);
        if let Some(sort) = spec.sort {
            find = find.sort(sort);
        }
        if let Some(skip) = spec.skip {
            find = find.skip(skip);
        }
        if let Some(limit) = spec.limit {
            find = find.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        let cursor = find.await?;
        Ok(cursor.map_err(StoreError::from).boxed())
    }

    async fn find_one(&self, collection: &str, filter: Document) -> StoreResult<Option<Document>> {
        Ok(self.collection(collection).find_one(filter).await?)
    }

    async fn insert_one(&self, collection: &str, document: Document) -> StoreResult<Bson> {
        let result = self.collection(collection).insert_one(document).await?;
        Ok(result.inserted_id)
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> StoreResult<u64> {
        if documents.is_empty() {
            return Ok(0);
        }
        let result = self.collection(collection).insert_many(documents).await?;
        Ok(result.inserted_ids.len() as u64)
    }

    async fn replace_one(&self, collection: &str, filter: Document, replacement: Document) -> StoreResult<UpdateOutcome> {
        let result = self
            .collection(collection)
            .replace_one(filter, replacement)
            .await?;
        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    async fn update_one(&self, collection: &str, filter: Document, update: Document) -> StoreResult<UpdateOutcome> {
        let result = self.collection(collection).update_one(filter, update).await?;
        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> StoreResult<u64> {
        Ok(self.collection(collection).delete_one(filter).await?.deleted_count)
    }

    async fn delete_many(&self, collection: &str, filter: Document) -> StoreResult<u64> {
        Ok(self.collection(collection).delete_many(filter).await?.deleted_count)
    }

    async fn drop_collection(&self, collection: &str) -> StoreResult<()> {
        self.collection(collection).drop().await?;
        Ok(())
    }

    async fn server_info(&self) -> StoreResult<Document> {
        Ok(self
            .client
            .database("admin")
            .run_command(doc! { "buildInfo": 1 })
            .await?)
    }

    async fn list_databases(&self) -> StoreResult<Vec<DatabaseInfo>> {
        let databases = self.client.list_databases().await?;
        Ok(databases
            .into_iter()
            .map(|spec| DatabaseInfo {
                name: spec.name,
                size_on_disk: spec.size_on_disk,
                empty: spec.empty,
            })
            .collect())
    }

    async fn shutdown(&self) -> StoreResult<()> {
        self.client.clone().shutdown().await;
        Ok(())
    }
}
