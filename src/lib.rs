// ============================================================================
// mongo_adapter Library
// ============================================================================
//
// MongoDB engine adapter: connections, paged collection reads, bounded row
// streams in both directions, and changeset application with per-category
// identifier reporting. Everything below the executors goes through the
// `DocumentStore` seam, so the same code runs against a live server or the
// in-memory store.
//
// ============================================================================

pub mod core;
pub mod connection;
pub mod storage;
pub mod protocol;
pub mod executor;
pub mod stream;
pub mod driver;

// Re-export main types for convenience
pub use crate::core::{Condition, DriverError, Result, StoreError};
pub use connection::{Connection, config::ConnectionConfig};
pub use driver::{EngineDriver, MongoDriver};
pub use executor::{apply_changeset, normalize, read_collection};
pub use protocol::{
    ChangeResult, ChangeSet, ChangeSummary, DeleteOp, InsertOp, QueryResult, ReadRequest,
    ReadResult, ServerInfo, SortDirection, UpdateOp, WriteTableOptions,
};
pub use storage::{DatabaseInfo, DocumentStore, MemoryStore, MongoStore};
pub use stream::{Record, ReadStream, StreamConfig, WriteSink, WriteSummary};

// Re-export the BSON types used throughout the public API
pub use mongodb::bson;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bson::doc;

    #[tokio::test]
    async fn test_driver_round_trip_in_memory() {
        let driver = MongoDriver::new();
        let conn = Connection::in_memory();

        let change_set = ChangeSet::new()
            .insert(InsertOp::new("users").document(doc! { "name": "Alice", "age": 30 }))
            .insert(InsertOp::new("users").document(doc! { "name": "Bob", "age": 25 }));
        let applied = driver.update_collection(&conn, &change_set).await;
        assert_eq!(applied.summary().unwrap().inserted.len(), 2);

        let request = ReadRequest::new("users")
            .condition(doc! { "age": { "$gt": 26 } })
            .sort_by("name", SortDirection::Ascending);
        let result = driver.read_collection(&conn, &request).await;
        let rows = result.rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_str("name").unwrap(), "Alice");

        driver.close(conn).await.unwrap();
    }
}
