/// Collection reader tests
///
/// Paged reads, counts and condition normalization against the in-memory store
/// Run with: cargo test --test collection_reader_tests

mod support;

use mongo_adapter::bson::{Bson, doc, oid::ObjectId};
use mongo_adapter::{Connection, MemoryStore, ReadRequest, ReadResult, SortDirection, read_collection};
use std::sync::Arc;
use support::seed_numbers;

async fn numbers_connection(count: i32) -> (Connection, MemoryStore) {
    let store = MemoryStore::new();
    seed_numbers(&store, "numbers", count).await;
    (Connection::from_store(Arc::new(store.clone())), store)
}

fn numbers(result: &ReadResult) -> Vec<i32> {
    result
        .rows()
        .expect("rows result")
        .iter()
        .map(|row| row.get_i32("n").unwrap())
        .collect()
}

#[tokio::test]
async fn test_skip_and_limit_window() {
    let (conn, _) = numbers_connection(10).await;

    let request = ReadRequest::new("numbers")
        .sort_by("n", SortDirection::Ascending)
        .skip(2)
        .limit(3);
    let result = read_collection(&conn, &request).await;

    assert_eq!(numbers(&result), vec![2, 3, 4]);
}

#[tokio::test]
async fn test_descending_sort() {
    let (conn, _) = numbers_connection(5).await;

    let request = ReadRequest::new("numbers")
        .sort_by("n", SortDirection::Descending)
        .limit(2);
    let result = read_collection(&conn, &request).await;

    assert_eq!(numbers(&result), vec![4, 3]);
}

#[tokio::test]
async fn test_zero_limit_returns_everything() {
    let (conn, _) = numbers_connection(7).await;

    let result = read_collection(&conn, &ReadRequest::new("numbers").limit(0)).await;
    assert_eq!(result.rows().unwrap().len(), 7);
}

#[tokio::test]
async fn test_count_ignores_paging() {
    let (conn, _) = numbers_connection(10).await;

    let request = ReadRequest::new("numbers")
        .condition(doc! { "n": { "$gte": 4 } })
        .skip(1)
        .limit(2)
        .count_only();
    let result = read_collection(&conn, &request).await;

    assert_eq!(result, ReadResult::Count { count: 6 });
    assert!(result.rows().is_none());
}

#[tokio::test]
async fn test_missing_collection_reads_empty() {
    let conn = Connection::in_memory();

    let rows = read_collection(&conn, &ReadRequest::new("nothing")).await;
    assert_eq!(rows, ReadResult::Rows { rows: vec![] });

    let count = read_collection(&conn, &ReadRequest::new("nothing").count_only()).await;
    assert_eq!(count, ReadResult::Count { count: 0 });
}

#[tokio::test]
async fn test_hex_identifier_condition_matches_object_id() {
    let conn = Connection::in_memory();
    let oid = ObjectId::new();
    let other = ObjectId::new();
    let change_set = mongo_adapter::ChangeSet::new()
        .insert(mongo_adapter::InsertOp::new("people").document(doc! { "_id": oid, "name": "Ada" }))
        .insert(mongo_adapter::InsertOp::new("people").document(doc! { "_id": other, "name": "Alan" }));
    assert!(!mongo_adapter::apply_changeset(&conn, &change_set).await.is_error());

    let request = ReadRequest::new("people").condition(doc! { "_id": oid.to_hex() });
    let result = read_collection(&conn, &request).await;

    let rows = result.rows().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("_id"), Some(&Bson::ObjectId(oid)));
}

#[tokio::test]
async fn test_compound_condition_is_not_rewritten() {
    let conn = Connection::in_memory();
    let oid = ObjectId::new();
    let change_set = mongo_adapter::ChangeSet::new()
        .insert(mongo_adapter::InsertOp::new("people").document(doc! { "_id": oid, "name": "Ada" }));
    mongo_adapter::apply_changeset(&conn, &change_set).await;

    // Hex string stays a string when other keys are present
    let request = ReadRequest::new("people").condition(doc! { "_id": oid.to_hex(), "name": "Ada" });
    let result = read_collection(&conn, &request).await;
    assert_eq!(result.rows().unwrap().len(), 0);
}

#[tokio::test]
async fn test_unsupported_operator_reported_as_error_message() {
    let (conn, _) = numbers_connection(3).await;

    let request = ReadRequest::new("numbers").condition(doc! { "n": { "$regex": "^1" } });
    let result = read_collection(&conn, &request).await;

    assert!(result.is_error());
    // Bare store message, no kind prefix
    assert_eq!(result.error_message(), Some("unknown operator: $regex"));
}

#[tokio::test]
async fn test_request_from_json() {
    let (conn, _) = numbers_connection(10).await;

    let request: ReadRequest = serde_json::from_str(
        r#"{
            "pureName": "numbers",
            "condition": { "n": { "$lt": 5 } },
            "sort": [["n", -1]],
            "skip": 1,
            "limit": 2
        }"#,
    )
    .unwrap();
    let result = read_collection(&conn, &request).await;

    assert_eq!(numbers(&result), vec![3, 2]);
    assert_eq!(
        serde_json::to_value(&result).unwrap()["rows"][0]["n"],
        serde_json::json!(3)
    );
}

#[test]
fn test_read_outside_async_test() {
    tokio_test::block_on(async {
        let (conn, store) = numbers_connection(4).await;
        let result = read_collection(&conn, &ReadRequest::new("numbers").count_only()).await;
        assert_eq!(result.count(), Some(4));
        assert_eq!(store.documents("numbers").await.len(), 4);
    });
}
