//! Streaming reads and writes
//!
//! Both directions put a bounded `tokio::sync::mpsc` channel between the store
//! and the consumer. A full channel suspends the producing side until the
//! other side takes an item, which keeps memory bounded by the window size.
//!
//! - `reader.rs` - [`ReadStream`], rows pulled from a store cursor
//! - `writer.rs` - [`WriteSink`], rows bulk-inserted in batches

mod reader;
mod writer;

pub use reader::{ReadStream, open_read_stream};
pub use writer::{WriteSink, WriteSummary, open_write_stream};

use mongodb::bson::Document;

/// Default number of records buffered ahead of the consumer
pub const DEFAULT_STREAM_BUFFER: usize = 100;

/// Default number of rows per bulk insert
pub const DEFAULT_WRITE_BATCH: usize = 100;

/// One item travelling through a stream
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// Structural description of the rows that follow
    Structure(Document),
    /// A single document
    Row(Document),
}

impl Record {
    pub fn as_row(&self) -> Option<&Document> {
        match self {
            Self::Row(row) => Some(row),
            Self::Structure(_) => None,
        }
    }

    pub fn into_row(self) -> Option<Document> {
        match self {
            Self::Row(row) => Some(row),
            Self::Structure(_) => None,
        }
    }
}

/// Window and batch sizes for streams
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    /// Records a read stream may buffer ahead of its consumer
    pub read_buffer: usize,
    /// Records a write sink accepts before `send` waits for the writer
    pub write_buffer: usize,
    /// Rows per bulk insert
    pub write_batch_size: usize,
}

impl StreamConfig {
    pub fn read_buffer(mut self, size: usize) -> Self {
        self.read_buffer = size.max(1);
        self
    }

    pub fn write_buffer(mut self, size: usize) -> Self {
        self.write_buffer = size.max(1);
        self
    }

    pub fn write_batch_size(mut self, size: usize) -> Self {
        self.write_batch_size = size.max(1);
        self
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            read_buffer: DEFAULT_STREAM_BUFFER,
            write_buffer: DEFAULT_STREAM_BUFFER,
            write_batch_size: DEFAULT_WRITE_BATCH,
        }
    }
}
