use crate::core::DriverError;
use mongodb::bson::{Bson, Document};
use serde::Serialize;

/// Outcome of a collection read
///
/// Exactly one shape is ever produced; serializes to `{count}`, `{rows}` or
/// `{errorMessage}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReadResult {
    Count {
        count: u64,
    },
    Rows {
        rows: Vec<Document>,
    },
    Failed {
        #[serde(rename = "errorMessage")]
        error_message: String,
    },
}

impl ReadResult {
    pub fn failed(err: &DriverError) -> Self {
        Self::Failed {
            error_message: err.message().to_string(),
        }
    }

    pub fn count(&self) -> Option<u64> {
        match self {
            Self::Count { count } => Some(*count),
            _ => None,
        }
    }

    pub fn rows(&self) -> Option<&[Document]> {
        match self {
            Self::Rows { rows } => Some(rows),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Failed { error_message } => Some(error_message),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Identifiers touched by a successfully applied changeset, per category
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChangeSummary {
    /// `_id` of each inserted document, store-assigned or caller-assigned
    pub inserted: Vec<Bson>,
    /// `_id` named by each matched partial update's condition (`null` when the
    /// condition selects by other fields); not confirmed by the store
    pub updated: Vec<Bson>,
    /// `_id` named by each delete condition that removed a document
    pub deleted: Vec<Bson>,
    /// `_id` of each replaced document, as read from the store
    pub replaced: Vec<Bson>,
}

impl ChangeSummary {
    pub fn total(&self) -> usize {
        self.inserted.len() + self.updated.len() + self.deleted.len() + self.replaced.len()
    }
}

/// Outcome of applying a changeset
///
/// Either the per-category identifier lists or an error message, never both.
/// A failure does not undo items applied before it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChangeResult {
    Applied(ChangeSummary),
    Failed {
        #[serde(rename = "errorMessage")]
        error_message: String,
    },
}

impl ChangeResult {
    pub fn failed(err: &DriverError) -> Self {
        Self::Failed {
            error_message: err.message().to_string(),
        }
    }

    pub fn summary(&self) -> Option<&ChangeSummary> {
        match self {
            Self::Applied(summary) => Some(summary),
            Self::Failed { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Failed { error_message } => Some(error_message),
            Self::Applied(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Result of a free-text query
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Document>,
}

impl QueryResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Server version details
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub version: String,
    pub version_text: String,
    /// Raw `buildInfo` reply
    pub build_info: Document,
}

impl ServerInfo {
    pub fn from_build_info(build_info: Document) -> Self {
        let version = build_info.get_str("version").unwrap_or("unknown").to_string();
        Self {
            version_text: format!("MongoDB {}", version),
            version,
            build_info,
        }
    }
}
