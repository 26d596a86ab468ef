use mongodb::bson::{Bson, Document};

/// Field name the store uses for a document's primary identifier
pub const ID_FIELD: &str = "_id";

/// A field-to-value/operator mapping used to select documents
pub type Condition = Document;

/// Shallow merge: keys of `overlay` replace keys of `base`.
///
/// Mirrors the `{ ...document, ...fields }` shape used by inserts and replaces.
pub fn merge_documents(base: Option<&Document>, overlay: Option<&Document>) -> Document {
    let mut merged = base.cloned().unwrap_or_default();
    if let Some(overlay) = overlay {
        for (key, value) in overlay {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// The `_id` value a condition names, if any
pub fn condition_identifier(condition: &Condition) -> Option<&Bson> {
    condition.get(ID_FIELD)
}
