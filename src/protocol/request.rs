//! Request shapes understood by the adapter
//!
//! Field names follow the client tool's JSON payloads (`pureName`,
//! `countDocuments`, ...). Conditions and documents deserialize straight into
//! BSON documents, so extended JSON such as `{"$oid": "..."}` is accepted too.

use crate::core::Condition;
use mongodb::bson::{Bson, Document};
use serde::Deserialize;
use std::fmt;

/// Direction of one sort key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawDirection")]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDirection {
    Number(i64),
    Text(String),
}

impl TryFrom<RawDirection> for SortDirection {
    type Error = String;

    fn try_from(raw: RawDirection) -> Result<Self, Self::Error> {
        match raw {
            RawDirection::Number(1) => Ok(Self::Ascending),
            RawDirection::Number(-1) => Ok(Self::Descending),
            RawDirection::Text(text) => match text.to_ascii_lowercase().as_str() {
                "asc" | "ascending" => Ok(Self::Ascending),
                "desc" | "descending" => Ok(Self::Descending),
                _ => Err(format!("invalid sort direction '{}'", text)),
            },
            RawDirection::Number(n) => Err(format!("invalid sort direction {}", n)),
        }
    }
}

impl SortDirection {
    fn as_bson(self) -> Bson {
        match self {
            Self::Ascending => Bson::Int32(1),
            Self::Descending => Bson::Int32(-1),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "ASC"),
            Self::Descending => write!(f, "DESC"),
        }
    }
}

/// Collection read request
///
/// `condition` defaults to match-all. `skip` and `limit` are applied by the
/// store after sorting; a zero `limit` means no limit.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadRequest {
    #[serde(alias = "collection")]
    pub pure_name: String,

    #[serde(default)]
    pub condition: Option<Condition>,

    /// Ordered `(field, direction)` pairs, first key most significant
    #[serde(default)]
    pub sort: Option<Vec<(String, SortDirection)>>,

    #[serde(default)]
    pub skip: Option<u64>,

    #[serde(default)]
    pub limit: Option<u64>,

    /// Return `{count}` instead of rows
    #[serde(default)]
    pub count_documents: bool,
}

impl ReadRequest {
    pub fn new(collection: &str) -> Self {
        Self {
            pure_name: collection.to_string(),
            ..Self::default()
        }
    }

    pub fn condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Append a sort key
    pub fn sort_by(mut self, field: &str, direction: SortDirection) -> Self {
        self.sort
            .get_or_insert_with(Vec::new)
            .push((field.to_string(), direction));
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn count_only(mut self) -> Self {
        self.count_documents = true;
        self
    }

    /// Sort keys as a store-native `{ field: 1 | -1 }` document
    pub fn sort_document(&self) -> Option<Document> {
        self.sort.as_ref().map(|keys| {
            let mut sort = Document::new();
            for (field, direction) in keys {
                sort.insert(field.clone(), direction.as_bson());
            }
            sort
        })
    }
}

/// Insert one document built from `document` overlaid with `fields`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertOp {
    #[serde(alias = "collection")]
    pub pure_name: String,
    #[serde(default)]
    pub document: Option<Document>,
    #[serde(default)]
    pub fields: Option<Document>,
}

impl InsertOp {
    pub fn new(collection: &str) -> Self {
        Self {
            pure_name: collection.to_string(),
            ..Self::default()
        }
    }

    pub fn document(mut self, document: Document) -> Self {
        self.document = Some(document);
        self
    }

    pub fn fields(mut self, fields: Document) -> Self {
        self.fields = Some(fields);
        self
    }
}

/// Update of the first document matching `condition`
///
/// With `document` set the match is replaced wholesale (keeping its `_id`);
/// without it `fields` are merged into the match.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOp {
    #[serde(alias = "collection")]
    pub pure_name: String,
    #[serde(default)]
    pub condition: Condition,
    #[serde(default)]
    pub document: Option<Document>,
    #[serde(default)]
    pub fields: Option<Document>,
}

impl UpdateOp {
    pub fn new(collection: &str, condition: Condition) -> Self {
        Self {
            pure_name: collection.to_string(),
            condition,
            ..Self::default()
        }
    }

    pub fn document(mut self, document: Document) -> Self {
        self.document = Some(document);
        self
    }

    pub fn fields(mut self, fields: Document) -> Self {
        self.fields = Some(fields);
        self
    }

    /// Whether this update takes the replace path
    pub fn is_replace(&self) -> bool {
        self.document.is_some()
    }
}

/// Delete of the first document matching `condition`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOp {
    #[serde(alias = "collection")]
    pub pure_name: String,
    #[serde(default)]
    pub condition: Condition,
}

impl DeleteOp {
    pub fn new(collection: &str, condition: Condition) -> Self {
        Self {
            pure_name: collection.to_string(),
            condition,
        }
    }
}

/// A batch of independent inserts, updates and deletes
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChangeSet {
    pub inserts: Vec<InsertOp>,
    pub updates: Vec<UpdateOp>,
    pub deletes: Vec<DeleteOp>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, op: InsertOp) -> Self {
        self.inserts.push(op);
        self
    }

    pub fn update(mut self, op: UpdateOp) -> Self {
        self.updates.push(op);
        self
    }

    pub fn delete(mut self, op: DeleteOp) -> Self {
        self.deletes.push(op);
        self
    }

    pub fn len(&self) -> usize {
        self.inserts.len() + self.updates.len() + self.deletes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Preparation applied by a write stream before its first batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WriteTableOptions {
    /// Drop the target collection first
    pub drop_if_exists: bool,
    /// Delete every existing document first
    pub truncate: bool,
}
