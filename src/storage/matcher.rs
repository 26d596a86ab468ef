// ============================================================================
// src/storage/matcher.rs - Filter evaluation and ordering for MemoryStore
// ============================================================================
//
// Implements the subset of the MongoDB query language the in-memory backend
// understands:
// - Equality on top-level and dotted paths (array fields match any element)
// - Comparison operators: $eq $ne $gt $gte $lt $lte $in $nin $exists
// - Logical operators at the top level: $and $or $nor
// - Update operators: $set $unset
//
// Ordering across types follows MongoDB's BSON comparison order.
//
// ============================================================================

use crate::core::{ID_FIELD, StoreError, StoreResult};
use mongodb::bson::{Bson, Document};
use std::cmp::Ordering;

// ============================================================================
// VALUE ORDERING
// ============================================================================

/// Rank of a BSON type in MongoDB's cross-type comparison order
fn type_rank(value: &Bson) -> u8 {
    match value {
        Bson::MinKey => 0,
        Bson::Null | Bson::Undefined => 1,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => 2,
        Bson::String(_) | Bson::Symbol(_) => 3,
        Bson::Document(_) => 4,
        Bson::Array(_) => 5,
        Bson::Binary(_) => 6,
        Bson::ObjectId(_) => 7,
        Bson::Boolean(_) => 8,
        Bson::DateTime(_) => 9,
        Bson::Timestamp(_) => 10,
        Bson::RegularExpression(_) => 11,
        Bson::MaxKey => 13,
        _ => 12,
    }
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(i) => Some(*i as f64),
        Bson::Int64(i) => Some(*i as f64),
        Bson::Double(f) => Some(*f),
        _ => None,
    }
}

/// Total order over BSON values
///
/// Values of different type classes order by [`type_rank`]; numbers compare
/// numerically regardless of width.
pub fn compare_values(a: &Bson, b: &Bson) -> Ordering {
    let (rank_a, rank_b) = (type_rank(a), type_rank(b));
    if rank_a != rank_b {
        return rank_a.cmp(&rank_b);
    }

    match (a, b) {
        (Bson::Int32(x), Bson::Int32(y)) => x.cmp(y),
        (Bson::Int64(x), Bson::Int64(y)) => x.cmp(y),
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
        (Bson::DateTime(x), Bson::DateTime(y)) => x.cmp(y),
        (Bson::Timestamp(x), Bson::Timestamp(y)) => (x.time, x.increment).cmp(&(y.time, y.increment)),
        (Bson::Array(x), Bson::Array(y)) => compare_sequences(x.iter(), y.iter()),
        (Bson::Document(x), Bson::Document(y)) => {
            for ((key_a, val_a), (key_b, val_b)) in x.iter().zip(y.iter()) {
                let ord = key_a.cmp(key_b).then_with(|| compare_values(val_a, val_b));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => match (as_f64(a), as_f64(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or_else(|| {
                // NaN sorts below every other number
                x.is_nan().cmp(&y.is_nan()).reverse()
            }),
            _ => Ordering::Equal,
        },
    }
}

fn compare_sequences<'a>(
    mut a: impl Iterator<Item = &'a Bson>,
    mut b: impl Iterator<Item = &'a Bson>,
) -> Ordering {
    loop {
        match (a.next(), b.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = compare_values(x, y);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

pub(crate) fn values_equal(a: &Bson, b: &Bson) -> bool {
    type_rank(a) == type_rank(b) && compare_values(a, b) == Ordering::Equal
}

// ============================================================================
// FIELD LOOKUP
// ============================================================================

/// Resolve a dotted path inside a document
pub fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut parts = path.split('.');
    let mut current = document.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Bson::Document(inner) => inner.get(part)?,
            Bson::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

// ============================================================================
// FILTER MATCHING
// ============================================================================

/// Check whether `document` satisfies `filter`
pub fn matches(document: &Document, filter: &Document) -> StoreResult<bool> {
    for (key, condition) in filter {
        let satisfied = match key.as_str() {
            "$and" => {
                let mut all = true;
                for clause in clauses(key, condition)? {
                    if !matches(document, clause)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$or" => {
                let mut any = false;
                for clause in clauses(key, condition)? {
                    if matches(document, clause)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            "$nor" => {
                let mut none = true;
                for clause in clauses(key, condition)? {
                    if matches(document, clause)? {
                        none = false;
                        break;
                    }
                }
                none
            }
            op if op.starts_with('$') => {
                return Err(StoreError::UnsupportedOperator(op.to_string()));
            }
            path => match_field(lookup(document, path), condition)?,
        };

        if !satisfied {
            return Ok(false);
        }
    }

    Ok(true)
}

fn clauses<'a>(operator: &str, value: &'a Bson) -> StoreResult<Vec<&'a Document>> {
    let items = value.as_array().ok_or_else(|| {
        StoreError::InvalidDocument(format!("{} must be an array", operator))
    })?;

    items
        .iter()
        .map(|item| {
            item.as_document().ok_or_else(|| {
                StoreError::InvalidDocument(format!("{} entries must be objects", operator))
            })
        })
        .collect()
}

fn is_operator_document(condition: &Bson) -> bool {
    match condition {
        Bson::Document(doc) => doc.keys().next().is_some_and(|key| key.starts_with('$')),
        _ => false,
    }
}

fn match_field(value: Option<&Bson>, condition: &Bson) -> StoreResult<bool> {
    if !is_operator_document(condition) {
        return Ok(equals(value, condition));
    }

    let Bson::Document(operators) = condition else {
        return Ok(false);
    };

    for (op, operand) in operators {
        let satisfied = match op.as_str() {
            "$eq" => equals(value, operand),
            "$ne" => !equals(value, operand),
            "$gt" => compare_with(value, operand, |ord| ord == Ordering::Greater),
            "$gte" => compare_with(value, operand, |ord| ord != Ordering::Less),
            "$lt" => compare_with(value, operand, |ord| ord == Ordering::Less),
            "$lte" => compare_with(value, operand, |ord| ord != Ordering::Greater),
            "$in" => in_list(value, operand)?,
            "$nin" => !in_list(value, operand)?,
            "$exists" => value.is_some() == truthy(operand),
            other => return Err(StoreError::UnsupportedOperator(other.to_string())),
        };

        if !satisfied {
            return Ok(false);
        }
    }

    Ok(true)
}

/// Equality with MongoDB semantics: a missing field equals null, and an
/// array field matches when any element equals the operand.
fn equals(value: Option<&Bson>, operand: &Bson) -> bool {
    match value {
        None => matches!(operand, Bson::Null),
        Some(actual) => {
            if values_equal(actual, operand) {
                return true;
            }
            match actual {
                Bson::Array(items) => items.iter().any(|item| values_equal(item, operand)),
                _ => false,
            }
        }
    }
}

/// Range comparison only between values of the same type class
fn compare_with(value: Option<&Bson>, operand: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
    let check = |actual: &Bson| {
        type_rank(actual) == type_rank(operand) && accept(compare_values(actual, operand))
    };

    match value {
        None => false,
        Some(Bson::Array(items)) if !matches!(operand, Bson::Array(_)) => items.iter().any(check),
        Some(actual) => check(actual),
    }
}

fn in_list(value: Option<&Bson>, operand: &Bson) -> StoreResult<bool> {
    let candidates = operand
        .as_array()
        .ok_or_else(|| StoreError::InvalidDocument("$in needs an array".to_string()))?;
    Ok(candidates.iter().any(|candidate| equals(value, candidate)))
}

fn truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(b) => *b,
        Bson::Null | Bson::Undefined => false,
        other => as_f64(other).map_or(true, |n| n != 0.0),
    }
}

// ============================================================================
// SORTING
// ============================================================================

/// Stable multi-key sort following a `{ field: 1 | -1 }` specification
///
/// Missing fields sort as null.
pub fn sort_documents(documents: &mut [Document], sort: &Document) -> StoreResult<()> {
    let mut keys = Vec::with_capacity(sort.len());
    for (field, direction) in sort {
        let descending = match as_f64(direction) {
            Some(d) if d == 1.0 => false,
            Some(d) if d == -1.0 => true,
            _ => {
                return Err(StoreError::InvalidDocument(format!(
                    "bad sort specification for '{}': {}",
                    field, direction
                )));
            }
        };
        keys.push((field.as_str(), descending));
    }

    documents.sort_by(|a, b| {
        for (field, descending) in &keys {
            let left = lookup(a, field).unwrap_or(&Bson::Null);
            let right = lookup(b, field).unwrap_or(&Bson::Null);
            let ord = compare_values(left, right);
            let ord = if *descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });

    Ok(())
}

// ============================================================================
// UPDATES
// ============================================================================

/// Apply `$set` / `$unset` operators to a document in place
pub fn apply_update(document: &mut Document, update: &Document) -> StoreResult<()> {
    if update.is_empty() {
        return Err(StoreError::InvalidDocument("update document must not be empty".to_string()));
    }

    for (op, operand) in update {
        let fields = operand.as_document().ok_or_else(|| {
            StoreError::InvalidDocument(format!("{} expects an object", op))
        })?;

        match op.as_str() {
            "$set" => {
                for (field, value) in fields {
                    if touches_id(field) && lookup(document, field) != Some(value) {
                        return Err(immutable_id());
                    }
                    set_path(document, field, value.clone())?;
                }
            }
            "$unset" => {
                for field in fields.keys() {
                    if touches_id(field) {
                        return Err(immutable_id());
                    }
                    unset_path(document, field);
                }
            }
            other if other.starts_with('$') => {
                return Err(StoreError::UnsupportedOperator(other.to_string()));
            }
            other => {
                return Err(StoreError::InvalidDocument(format!(
                    "update document requires atomic operators, found '{}'",
                    other
                )));
            }
        }
    }

    Ok(())
}

fn touches_id(path: &str) -> bool {
    path == ID_FIELD || path.strip_prefix(ID_FIELD).is_some_and(|rest| rest.starts_with('.'))
}

/// Assign at a dotted path, creating missing intermediate documents
fn set_path(document: &mut Document, path: &str, value: Bson) -> StoreResult<()> {
    let Some((head, rest)) = path.split_once('.') else {
        document.insert(path, value);
        return Ok(());
    };

    if !document.contains_key(head) {
        document.insert(head, Document::new());
    }
    match document.get_mut(head) {
        Some(child) => set_in_value(child, head, rest, value),
        None => Err(cannot_create(rest, head)),
    }
}

fn set_in_value(target: &mut Bson, parent: &str, path: &str, value: Bson) -> StoreResult<()> {
    match target {
        Bson::Document(inner) => set_path(inner, path, value),
        Bson::Array(items) => {
            let (head, rest) = match path.split_once('.') {
                Some((head, rest)) => (head, Some(rest)),
                None => (path, None),
            };
            let index: usize = head.parse().map_err(|_| cannot_create(head, parent))?;
            if items.len() <= index {
                // Gaps are padded with nulls
                items.resize(index + 1, Bson::Null);
            }
            match rest {
                None => {
                    items[index] = value;
                    Ok(())
                }
                Some(rest) => {
                    if items[index] == Bson::Null {
                        items[index] = Bson::Document(Document::new());
                    }
                    set_in_value(&mut items[index], head, rest, value)
                }
            }
        }
        _ => Err(cannot_create(path, parent)),
    }
}

/// Remove at a dotted path; missing paths are ignored
fn unset_path(document: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            document.remove(path);
        }
        Some((head, rest)) => {
            if let Some(child) = document.get_mut(head) {
                unset_in_value(child, rest);
            }
        }
    }
}

fn unset_in_value(target: &mut Bson, path: &str) {
    match target {
        Bson::Document(inner) => unset_path(inner, path),
        Bson::Array(items) => {
            let (head, rest) = match path.split_once('.') {
                Some((head, rest)) => (head, Some(rest)),
                None => (path, None),
            };
            let Some(item) = head.parse::<usize>().ok().and_then(|index| items.get_mut(index)) else {
                return;
            };
            match rest {
                // Array elements are nulled, not removed
                None => *item = Bson::Null,
                Some(rest) => unset_in_value(item, rest),
            }
        }
        _ => {}
    }
}

fn cannot_create(field: &str, parent: &str) -> StoreError {
    StoreError::InvalidDocument(format!(
        "Cannot create field '{}' in element '{}'",
        field, parent
    ))
}

/// Reject replacement documents that carry update operators
pub fn validate_replacement(replacement: &Document) -> StoreResult<()> {
    if let Some(key) = replacement.keys().find(|key| key.starts_with('$')) {
        return Err(StoreError::InvalidDocument(format!(
            "replacement document must not contain operator '{}'",
            key
        )));
    }
    Ok(())
}

fn immutable_id() -> StoreError {
    StoreError::InvalidDocument(
        "Performing an update on the path '_id' would modify the immutable field '_id'".to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[test]
    fn test_equality_and_missing_fields() {
        let document = doc! { "name": "Alice", "age": 30, "tags": ["a", "b"] };

        assert!(matches(&document, &doc! { "name": "Alice" }).unwrap());
        assert!(!matches(&document, &doc! { "name": "Bob" }).unwrap());
        assert!(matches(&document, &doc! { "age": 30_i64 }).unwrap());
        assert!(matches(&document, &doc! { "tags": "b" }).unwrap());
        assert!(matches(&document, &doc! { "missing": Bson::Null }).unwrap());
        assert!(matches(&document, &doc! {}).unwrap());
    }

    #[test]
    fn test_comparison_operators() {
        let document = doc! { "age": 30, "name": "Alice" };

        assert!(matches(&document, &doc! { "age": { "$gt": 25 } }).unwrap());
        assert!(matches(&document, &doc! { "age": { "$gte": 30, "$lt": 31.5 } }).unwrap());
        assert!(!matches(&document, &doc! { "age": { "$lt": 30 } }).unwrap());
        // No cross-type range matches
        assert!(!matches(&document, &doc! { "age": { "$gt": "10" } }).unwrap());
        assert!(matches(&document, &doc! { "name": { "$in": ["Bob", "Alice"] } }).unwrap());
        assert!(matches(&document, &doc! { "name": { "$nin": ["Bob"] } }).unwrap());
        assert!(matches(&document, &doc! { "email": { "$exists": false } }).unwrap());
        assert!(matches(&document, &doc! { "age": { "$ne": 31 } }).unwrap());
    }

    #[test]
    fn test_logical_operators() {
        let document = doc! { "a": 1, "b": 2 };

        assert!(matches(&document, &doc! { "$or": [{ "a": 5 }, { "b": 2 }] }).unwrap());
        assert!(!matches(&document, &doc! { "$and": [{ "a": 1 }, { "b": 3 }] }).unwrap());
        assert!(matches(&document, &doc! { "$nor": [{ "a": 2 }] }).unwrap());
    }

    #[test]
    fn test_unknown_operator_is_error() {
        let document = doc! { "a": 1 };
        assert!(matches(&document, &doc! { "a": { "$regex": "x" } }).is_err());
        assert!(matches(&document, &doc! { "$where": "true" }).is_err());
    }

    #[test]
    fn test_dotted_lookup() {
        let document = doc! { "address": { "city": "Oslo" }, "items": [{ "sku": 1 }] };
        assert_eq!(lookup(&document, "address.city"), Some(&Bson::String("Oslo".into())));
        assert_eq!(lookup(&document, "items.0.sku"), Some(&Bson::Int32(1)));
        assert_eq!(lookup(&document, "address.zip"), None);
    }

    #[test]
    fn test_sort_multi_key_stable() {
        let mut docs = vec![
            doc! { "g": 1, "n": 3, "i": 0 },
            doc! { "g": 2, "n": 1, "i": 1 },
            doc! { "g": 1, "n": 3, "i": 2 },
            doc! { "n": 9, "i": 3 },
        ];

        sort_documents(&mut docs, &doc! { "g": -1, "n": 1 }).unwrap();

        let order: Vec<i32> = docs.iter().map(|d| d.get_i32("i").unwrap()).collect();
        assert_eq!(order, vec![1, 0, 2, 3]);
    }

    #[test]
    fn test_sort_rejects_bad_direction() {
        let mut docs = vec![doc! { "a": 1 }];
        assert!(sort_documents(&mut docs, &doc! { "a": 2 }).is_err());
    }

    #[test]
    fn test_cross_type_order() {
        assert_eq!(compare_values(&Bson::Null, &Bson::Int32(0)), Ordering::Less);
        assert_eq!(compare_values(&Bson::Int32(5), &Bson::String("1".into())), Ordering::Less);
        assert_eq!(compare_values(&Bson::Int64(2), &Bson::Double(1.5)), Ordering::Greater);
    }

    #[test]
    fn test_apply_update() {
        let mut document = doc! { "_id": 1, "a": 1, "b": 1 };
        apply_update(&mut document, &doc! { "$set": { "a": 2 }, "$unset": { "b": "" } }).unwrap();
        assert_eq!(document, doc! { "_id": 1, "a": 2 });

        assert!(apply_update(&mut document, &doc! { "$set": { "_id": 2 } }).is_err());
        assert!(apply_update(&mut document, &doc! { "a": 3 }).is_err());
        assert!(apply_update(&mut document, &doc! { "$inc": { "a": 1 } }).is_err());
    }

    #[test]
    fn test_set_dotted_path_updates_nested_field() {
        let mut document = doc! { "_id": 1, "address": { "city": "Oslo", "zip": "0150" } };
        apply_update(&mut document, &doc! { "$set": { "address.city": "Bergen" } }).unwrap();
        assert_eq!(document, doc! { "_id": 1, "address": { "city": "Bergen", "zip": "0150" } });

        apply_update(&mut document, &doc! { "$set": { "meta.tags.0": "new" } }).unwrap();
        assert_eq!(lookup(&document, "meta.tags.0"), Some(&Bson::String("new".into())));
        assert!(document.get("meta.tags.0").is_none());
    }

    #[test]
    fn test_set_dotted_path_into_array_and_scalar() {
        let mut document = doc! { "_id": 1, "scores": [1, 2], "name": "x" };
        apply_update(&mut document, &doc! { "$set": { "scores.1": 5, "scores.3": 7 } }).unwrap();
        assert_eq!(document.get_array("scores").unwrap(), &vec![Bson::Int32(1), Bson::Int32(5), Bson::Null, Bson::Int32(7)]);

        let err = apply_update(&mut document, &doc! { "$set": { "name.first": "y" } }).unwrap_err();
        assert!(matches!(err, StoreError::InvalidDocument(_)));
    }

    #[test]
    fn test_unset_dotted_path() {
        let mut document = doc! { "_id": 1, "address": { "city": "Oslo", "zip": "0150" }, "tags": ["a", "b"] };
        apply_update(
            &mut document,
            &doc! { "$unset": { "address.zip": "", "tags.0": "", "missing.path": "" } },
        )
        .unwrap();
        assert_eq!(document, doc! { "_id": 1, "address": { "city": "Oslo" }, "tags": [null, "b"] });

        assert!(apply_update(&mut document, &doc! { "$unset": { "_id.x": "" } }).is_err());
    }
}
