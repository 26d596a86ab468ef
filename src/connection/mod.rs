pub mod config;

use crate::core::Result;
use crate::storage::{DocumentStore, MemoryStore, MongoStore};
use config::ConnectionConfig;
use log::{debug, info};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Database connection handle
///
/// Opaque handle to a pooled session against one database. Clones share the
/// same underlying pool, so one connection can serve many concurrent reads
/// and changesets; the store driver schedules the physical sockets.
#[derive(Clone)]
pub struct Connection {
    /// Unique connection ID
    id: u64,
    store: Arc<dyn DocumentStore>,
}

impl Connection {
    /// Connect to a MongoDB server
    ///
    /// Resolves only once the server has answered, so an unreachable host or
    /// rejected credentials surface here as [`DriverError::Connection`](crate::DriverError::Connection).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use mongo_adapter::{Connection, ConnectionConfig};
    /// # async fn example() -> mongo_adapter::Result<()> {
    /// let config = ConnectionConfig::new("localhost", 27017).database("crm");
    /// let conn = Connection::connect(&config).await?;
    /// conn.close().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        config.validate()?;

        debug!("Connecting to {}", config.redacted_url());
        let store = MongoStore::connect(
            &config.to_url(),
            config.app_name.as_deref(),
            config.connect_timeout,
        )
        .await
        .map_err(|e| e.into_connection())?;

        let conn = Self::from_store(Arc::new(store));
        info!("Connection {} established to {}:{}", conn.id, config.server, config.port);
        Ok(conn)
    }

    /// Wrap any store backend in a connection handle
    pub fn from_store(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::SeqCst),
            store,
        }
    }

    /// Connection backed by a fresh [`MemoryStore`]
    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(MemoryStore::new()))
    }

    /// Get connection ID
    pub fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    pub(crate) fn shared_store(&self) -> Arc<dyn DocumentStore> {
        Arc::clone(&self.store)
    }

    /// Close the connection and release the pool
    ///
    /// Other clones of this handle become unusable once the pool shuts down.
    pub async fn close(self) -> Result<()> {
        self.store.shutdown().await.map_err(|e| e.into_connection())?;
        info!("Connection {} closed", self.id);
        Ok(())
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection").field("id", &self.id).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DriverError;
    use std::time::Duration;

    #[test]
    fn test_connection_ids_are_unique() {
        let first = Connection::in_memory();
        let second = Connection::in_memory();
        assert_ne!(first.id(), second.id());
        assert_eq!(first.clone().id(), first.id());
    }

    #[tokio::test]
    async fn test_close_in_memory() {
        let conn = Connection::in_memory();
        assert!(conn.close().await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_before_connect() {
        let config = ConnectionConfig::new("", 27017);
        let err = Connection::connect(&config).await.unwrap_err();
        assert!(matches!(err, DriverError::Config(_)));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_connection_error() {
        // Port 1 on loopback refuses connections immediately
        let config = ConnectionConfig::new("127.0.0.1", 1)
            .connect_timeout(Duration::from_millis(200));

        let err = Connection::connect(&config).await.unwrap_err();
        assert!(matches!(err, DriverError::Connection(_)));
    }
}
