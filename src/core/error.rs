use thiserror::Error;

/// Errors surfaced by the adapter to its callers.
///
/// Each variant names the component that failed. `read_collection` and
/// `apply_changeset` never return these directly; they fold them into an
/// `errorMessage` response instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Changeset error: {0}")]
    Changeset(String),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
}

impl DriverError {
    /// The underlying message without the kind prefix
    pub fn message(&self) -> &str {
        match self {
            Self::Connection(msg)
            | Self::Query(msg)
            | Self::Changeset(msg)
            | Self::Stream(msg)
            | Self::Config(msg)
            | Self::UnsupportedOperation(msg) => msg,
        }
    }
}

pub type Result<T> = std::result::Result<T, DriverError>;

/// Errors raised by a [`DocumentStore`](crate::storage::DocumentStore) backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("E11000 duplicate key error collection: {collection} dup key: {{ _id: {key} }}")]
    DuplicateKey { collection: String, key: String },

    #[error("unknown operator: {0}")]
    UnsupportedOperator(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("{0}")]
    Other(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

impl StoreError {
    pub(crate) fn into_query(self) -> DriverError {
        DriverError::Query(self.to_string())
    }

    pub(crate) fn into_changeset(self) -> DriverError {
        DriverError::Changeset(self.to_string())
    }

    pub(crate) fn into_stream(self) -> DriverError {
        DriverError::Stream(self.to_string())
    }

    pub(crate) fn into_connection(self) -> DriverError {
        DriverError::Connection(self.to_string())
    }
}
