use crate::core::{Condition, ID_FIELD};
use lazy_static::lazy_static;
use mongodb::bson::{Bson, oid::ObjectId};
use regex::Regex;

lazy_static! {
    /// Lowercase hex form of an ObjectId
    static ref OBJECT_ID_HEX: Regex = Regex::new(r"^[0-9a-f]{24}$").unwrap();
}

/// Rewrite an identifier lookup into the store's native `ObjectId`
///
/// Only a condition made of exactly the `_id` field with a 24-character
/// lowercase hex string value is touched. Everything else, including uppercase
/// hex and `_id` alongside other fields, is returned unchanged for the store
/// to interpret.
pub fn normalize(condition: Condition) -> Condition {
    if condition.len() != 1 {
        return condition;
    }

    let object_id = match condition.get(ID_FIELD) {
        Some(Bson::String(hex)) if OBJECT_ID_HEX.is_match(hex) => ObjectId::parse_str(hex).ok(),
        _ => None,
    };

    match object_id {
        Some(oid) => {
            let mut filter = Condition::new();
            filter.insert(ID_FIELD, oid);
            filter
        }
        None => condition,
    }
}

/// Normalize an optional condition, treating absence as match-all
pub fn normalize_or_all(condition: Option<&Condition>) -> Condition {
    condition.cloned().map(normalize).unwrap_or_default()
}
