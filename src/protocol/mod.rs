//! Wire-level request and response types
//!
//! - `request.rs` - read requests, changesets, write-stream options
//! - `response.rs` - read/changeset results and metadata replies

mod request;
mod response;

pub use request::{
    ChangeSet, DeleteOp, InsertOp, ReadRequest, SortDirection, UpdateOp, WriteTableOptions,
};
pub use response::{ChangeResult, ChangeSummary, QueryResult, ReadResult, ServerInfo};
