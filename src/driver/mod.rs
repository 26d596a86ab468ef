//! Engine driver contract
//!
//! A host application talks to every database engine through [`EngineDriver`].
//! Each method has a provided body that reports the operation as unsupported,
//! so an engine only overrides what it can actually do.

mod mongo;

pub use mongo::MongoDriver;

use crate::connection::{Connection, config::ConnectionConfig};
use crate::core::{DriverError, Result};
use crate::protocol::{
    ChangeResult, ChangeSet, QueryResult, ReadRequest, ReadResult, ServerInfo, WriteTableOptions,
};
use crate::storage::DatabaseInfo;
use crate::stream::{ReadStream, WriteSink};
use async_trait::async_trait;
use mongodb::bson::Document;

fn unsupported(engine: &str, operation: &str) -> DriverError {
    DriverError::UnsupportedOperation(format!("{} driver does not support {}", engine, operation))
}

/// Operations a host can invoke on a database engine
#[async_trait]
pub trait EngineDriver: Send + Sync {
    /// Short engine identifier, e.g. `mongo`
    fn engine(&self) -> &'static str;

    /// Human-readable engine name
    fn title(&self) -> &'static str;

    async fn connect(&self, _config: &ConnectionConfig) -> Result<Connection> {
        Err(unsupported(self.engine(), "connect"))
    }

    async fn close(&self, _conn: Connection) -> Result<()> {
        Err(unsupported(self.engine(), "close"))
    }

    /// Run a free-text query
    async fn query(&self, _conn: &Connection, _text: &str) -> Result<QueryResult> {
        Err(unsupported(self.engine(), "query"))
    }

    /// Stream rows, preceded by `structure` when given
    async fn read_query(
        &self,
        _conn: &Connection,
        _request: ReadRequest,
        _structure: Option<Document>,
    ) -> Result<ReadStream> {
        Err(unsupported(self.engine(), "read_query"))
    }

    /// Open a bulk-insert stream into `collection`
    async fn write_table(
        &self,
        _conn: &Connection,
        _collection: &str,
        _options: WriteTableOptions,
    ) -> Result<WriteSink> {
        Err(unsupported(self.engine(), "write_table"))
    }

    async fn get_version(&self, _conn: &Connection) -> Result<ServerInfo> {
        Err(unsupported(self.engine(), "get_version"))
    }

    async fn list_databases(&self, _conn: &Connection) -> Result<Vec<DatabaseInfo>> {
        Err(unsupported(self.engine(), "list_databases"))
    }

    /// Paged read or count; errors are reported in the result value
    async fn read_collection(&self, _conn: &Connection, _request: &ReadRequest) -> ReadResult {
        ReadResult::failed(&unsupported(self.engine(), "read_collection"))
    }

    /// Apply a changeset; errors are reported in the result value
    async fn update_collection(&self, _conn: &Connection, _change_set: &ChangeSet) -> ChangeResult {
        ChangeResult::failed(&unsupported(self.engine(), "update_collection"))
    }
}
