use super::engine::{DatabaseInfo, DocumentCursor, DocumentStore, FindSpec, UpdateOutcome};
use super::matcher::{apply_update, matches, sort_documents, validate_replacement, values_equal};
use crate::core::{ID_FIELD, StoreError, StoreResult};
use async_trait::async_trait;
use futures::StreamExt;
use mongodb::bson::{Bson, Document, doc, oid::ObjectId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

const DEFAULT_DATABASE: &str = "test";

/// In-memory document store
///
/// Collections keep documents in insertion order, which is the natural order
/// returned by unsorted finds. Clone-friendly via Arc: clones share data.
#[derive(Clone)]
pub struct MemoryStore {
    database: String,
    collections: Arc<RwLock<HashMap<String, Vec<Document>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_database(DEFAULT_DATABASE)
    }

    /// Create a store reporting `database` as its only database
    pub fn with_database(database: &str) -> Self {
        Self {
            database: database.to_string(),
            collections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Snapshot of a collection's documents in natural order
    pub async fn documents(&self, collection: &str) -> Vec<Document> {
        let collections = self.collections.read().await;
        collections.get(collection).cloned().unwrap_or_default()
    }

    /// Collection names
    pub async fn list_collections(&self) -> Vec<String> {
        let collections = self.collections.read().await;
        let mut names: Vec<String> = collections.keys().cloned().collect();
        names.sort();
        names
    }

    fn namespace(&self, collection: &str) -> String {
        format!("{}.{}", self.database, collection)
    }

    fn position(documents: &[Document], filter: &Document) -> StoreResult<Option<usize>> {
        for (index, document) in documents.iter().enumerate() {
            if matches(document, filter)? {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    fn filtered(documents: &[Document], filter: &Document) -> StoreResult<Vec<Document>> {
        let mut out = Vec::new();
        for document in documents {
            if matches(document, filter)? {
                out.push(document.clone());
            }
        }
        Ok(out)
    }

    /// Assign an `_id` when missing and reject duplicates
    fn prepare_insert(
        &self,
        collection: &str,
        existing: &[Document],
        mut document: Document,
    ) -> StoreResult<(Bson, Document)> {
        let id = match document.get(ID_FIELD) {
            Some(id) => id.clone(),
            None => {
                let id = Bson::ObjectId(ObjectId::new());
                // _id leads the document, as the server stores it
                let mut with_id = Document::new();
                with_id.insert(ID_FIELD, id.clone());
                for (key, value) in document {
                    with_id.insert(key, value);
                }
                document = with_id;
                id
            }
        };

        // Numerically equal ids of different widths collide, as on the server
        if existing
            .iter()
            .any(|doc| doc.get(ID_FIELD).is_some_and(|other| values_equal(other, &id)))
        {
            return Err(StoreError::DuplicateKey {
                collection: self.namespace(collection),
                key: id.to_string(),
            });
        }

        Ok((id, document))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn count(&self, collection: &str, filter: Document) -> StoreResult<u64> {
        let collections = self.collections.read().await;
        let documents = collections.get(collection).map(Vec::as_slice).unwrap_or_default();
        Ok(Self::filtered(documents, &filter)?.len() as u64)
    }

    async fn find(&self, collection: &str, filter: Document, spec: FindSpec) -> StoreResult<DocumentCursor> {
        let mut rows = {
            let collections = self.collections.read().await;
            let documents = collections.get(collection).map(Vec::as_slice).unwrap_or_default();
            Self::filtered(documents, &filter)?
        };

        if let Some(sort) = &spec.sort {
            sort_documents(&mut rows, sort)?;
        }

        let skip = spec.skip.unwrap_or(0) as usize;
        let limit = match spec.limit {
            Some(0) | None => usize::MAX,
            Some(limit) => limit as usize,
        };

        let rows: Vec<StoreResult<Document>> = rows.into_iter().skip(skip).take(limit).map(Ok).collect();
        Ok(futures::stream::iter(rows).boxed())
    }

    async fn find_one(&self, collection: &str, filter: Document) -> StoreResult<Option<Document>> {
        let collections = self.collections.read().await;
        let documents = collections.get(collection).map(Vec::as_slice).unwrap_or_default();
        Ok(Self::position(documents, &filter)?.map(|index| documents[index].clone()))
    }

    async fn insert_one(&self, collection: &str, document: Document) -> StoreResult<Bson> {
        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection.to_string()).or_default();
        let (id, document) = self.prepare_insert(collection, documents, document)?;
        documents.push(document);
        Ok(id)
    }

    async fn insert_many(&self, collection: &str, batch: Vec<Document>) -> StoreResult<u64> {
        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection.to_string()).or_default();

        // Ordered insert: documents before a failure stay written
        let mut written = 0;
        for document in batch {
            let (_, document) = self.prepare_insert(collection, documents, document)?;
            documents.push(document);
            written += 1;
        }
        Ok(written)
    }

    async fn replace_one(&self, collection: &str, filter: Document, replacement: Document) -> StoreResult<UpdateOutcome> {
        validate_replacement(&replacement)?;

        let mut collections = self.collections.write().await;
        let Some(documents) = collections.get_mut(collection) else {
            return Ok(UpdateOutcome::default());
        };
        let Some(index) = Self::position(documents, &filter)? else {
            return Ok(UpdateOutcome::default());
        };

        let current_id = documents[index].get(ID_FIELD).cloned();
        if let Some(new_id) = replacement.get(ID_FIELD) {
            if current_id.as_ref() != Some(new_id) {
                return Err(StoreError::InvalidDocument(
                    "the (immutable) field '_id' was found to have been altered".to_string(),
                ));
            }
        }

        let mut replaced = Document::new();
        if let Some(id) = current_id {
            replaced.insert(ID_FIELD, id);
        }
        for (key, value) in replacement {
            if key != ID_FIELD {
                replaced.insert(key, value);
            }
        }

        let modified = u64::from(documents[index] != replaced);
        documents[index] = replaced;
        Ok(UpdateOutcome { matched: 1, modified })
    }

    async fn update_one(&self, collection: &str, filter: Document, update: Document) -> StoreResult<UpdateOutcome> {
        let mut collections = self.collections.write().await;
        let Some(documents) = collections.get_mut(collection) else {
            return Ok(UpdateOutcome::default());
        };
        let Some(index) = Self::position(documents, &filter)? else {
            return Ok(UpdateOutcome::default());
        };

        let mut updated = documents[index].clone();
        apply_update(&mut updated, &update)?;
        let modified = u64::from(documents[index] != updated);
        documents[index] = updated;
        Ok(UpdateOutcome { matched: 1, modified })
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> StoreResult<u64> {
        let mut collections = self.collections.write().await;
        let Some(documents) = collections.get_mut(collection) else {
            return Ok(0);
        };
        match Self::position(documents, &filter)? {
            Some(index) => {
                documents.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_many(&self, collection: &str, filter: Document) -> StoreResult<u64> {
        let mut collections = self.collections.write().await;
        let Some(documents) = collections.get_mut(collection) else {
            return Ok(0);
        };

        // Evaluate every match before touching the collection
        let mut doomed = Vec::with_capacity(documents.len());
        for document in documents.iter() {
            doomed.push(matches(document, &filter)?);
        }

        let before = documents.len();
        let mut flags = doomed.into_iter();
        documents.retain(|_| !flags.next().unwrap_or(false));
        Ok((before - documents.len()) as u64)
    }

    async fn drop_collection(&self, collection: &str) -> StoreResult<()> {
        let mut collections = self.collections.write().await;
        collections.remove(collection);
        Ok(())
    }

    async fn server_info(&self) -> StoreResult<Document> {
        Ok(doc! {
            "version": env!("CARGO_PKG_VERSION"),
            "storageEngines": ["memory"],
            "ok": 1.0,
        })
    }

    async fn list_databases(&self) -> StoreResult<Vec<DatabaseInfo>> {
        let collections = self.collections.read().await;
        Ok(vec![DatabaseInfo {
            name: self.database.clone(),
            size_on_disk: 0,
            empty: collections.values().all(Vec::is_empty),
        }])
    }
}
