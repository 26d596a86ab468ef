use super::EngineDriver;
use crate::connection::{Connection, config::ConnectionConfig};
use crate::core::Result;
use crate::executor;
use crate::protocol::{
    ChangeResult, ChangeSet, QueryResult, ReadRequest, ReadResult, ServerInfo, WriteTableOptions,
};
use crate::storage::DatabaseInfo;
use crate::stream::{self, ReadStream, StreamConfig, WriteSink};
use async_trait::async_trait;
use log::{debug, info};
use mongodb::bson::Document;

/// MongoDB implementation of [`EngineDriver`]
#[derive(Debug, Clone, Default)]
pub struct MongoDriver {
    streams: StreamConfig,
}

impl MongoDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stream_config(streams: StreamConfig) -> Self {
        Self { streams }
    }

    pub fn stream_config(&self) -> &StreamConfig {
        &self.streams
    }
}

#[async_trait]
impl EngineDriver for MongoDriver {
    fn engine(&self) -> &'static str {
        "mongo"
    }

    fn title(&self) -> &'static str {
        "MongoDB"
    }

    async fn connect(&self, config: &ConnectionConfig) -> Result<Connection> {
        Connection::connect(config).await
    }

    async fn close(&self, conn: Connection) -> Result<()> {
        conn.close().await
    }

    /// Free-text queries are not interpreted; always an empty result
    async fn query(&self, conn: &Connection, text: &str) -> Result<QueryResult> {
        debug!("Connection {} ignoring free-text query ({} bytes)", conn.id(), text.len());
        Ok(QueryResult::empty())
    }

    async fn read_query(
        &self,
        conn: &Connection,
        request: ReadRequest,
        structure: Option<Document>,
    ) -> Result<ReadStream> {
        Ok(stream::open_read_stream(conn, request, structure, &self.streams))
    }

    async fn write_table(
        &self,
        conn: &Connection,
        collection: &str,
        options: WriteTableOptions,
    ) -> Result<WriteSink> {
        stream::open_write_stream(conn, collection, options, &self.streams).await
    }

    async fn get_version(&self, conn: &Connection) -> Result<ServerInfo> {
        let build_info = conn
            .store()
            .server_info()
            .await
            .map_err(|e| e.into_query())?;
        let info = ServerInfo::from_build_info(build_info);
        info!("Connection {} server version {}", conn.id(), info.version);
        Ok(info)
    }

    async fn list_databases(&self, conn: &Connection) -> Result<Vec<DatabaseInfo>> {
        conn.store()
            .list_databases()
            .await
            .map_err(|e| e.into_query())
    }

    async fn read_collection(&self, conn: &Connection, request: &ReadRequest) -> ReadResult {
        executor::read_collection(conn, request).await
    }

    async fn update_collection(&self, conn: &Connection, change_set: &ChangeSet) -> ChangeResult {
        executor::apply_changeset(conn, change_set).await
    }
}
