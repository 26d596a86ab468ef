use super::condition::normalize_or_all;
use crate::connection::Connection;
use crate::core::Result;
use crate::protocol::{ReadRequest, ReadResult};
use crate::storage::FindSpec;
use futures::TryStreamExt;
use log::{debug, warn};

/// Read a collection: count, or rows shaped by sort/skip/limit
///
/// Never fails at the call level; any store error comes back as
/// [`ReadResult::Failed`].
///
/// # Examples
///
/// ```
/// # use mongo_adapter::{Connection, ReadRequest, SortDirection, read_collection};
/// # tokio_test::block_on(async {
/// let conn = Connection::in_memory();
/// let request = ReadRequest::new("users")
///     .sort_by("name", SortDirection::Ascending)
///     .skip(10)
///     .limit(5);
///
/// let result = read_collection(&conn, &request).await;
/// assert_eq!(result.rows().map(<[_]>::len), Some(0));
/// # });
/// ```
pub async fn read_collection(conn: &Connection, request: &ReadRequest) -> ReadResult {
    debug!(
        "Reading collection '{}' (count_only={}, skip={:?}, limit={:?})",
        request.pure_name, request.count_documents, request.skip, request.limit
    );

    let result = if request.count_documents {
        count(conn, request).await.map(|count| ReadResult::Count { count })
    } else {
        fetch(conn, request).await.map(|rows| ReadResult::Rows { rows })
    };

    result.unwrap_or_else(|err| {
        warn!("Read of '{}' failed: {}", request.pure_name, err);
        ReadResult::failed(&err)
    })
}

async fn count(conn: &Connection, request: &ReadRequest) -> Result<u64> {
    let filter = normalize_or_all(request.condition.as_ref());
    conn.store()
        .count(&request.pure_name, filter)
        .await
        .map_err(|e| e.into_query())
}

async fn fetch(conn: &Connection, request: &ReadRequest) -> Result<Vec<mongodb::bson::Document>> {
    let filter = normalize_or_all(request.condition.as_ref());
    let cursor = conn
        .store()
        .find(&request.pure_name, filter, find_spec(request))
        .await
        .map_err(|e| e.into_query())?;

    cursor.try_collect::<Vec<_>>().await.map_err(|e| e.into_query())
}

/// Translate paging options into store-side cursor options
///
/// A zero `skip` is dropped so the store sees no skip stage at all.
pub(crate) fn find_spec(request: &ReadRequest) -> FindSpec {
    FindSpec {
        sort: request.sort_document(),
        skip: request.skip.filter(|skip| *skip > 0),
        limit: request.limit.filter(|limit| *limit > 0),
    }
}
