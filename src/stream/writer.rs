use super::{Record, StreamConfig};
use crate::connection::Connection;
use crate::core::{DriverError, Result};
use crate::protocol::WriteTableOptions;
use crate::storage::DocumentStore;
use log::{debug, error, info, warn};
use mongodb::bson::Document;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Totals reported when a [`WriteSink`] is closed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub inserted: u64,
    pub batches: u64,
}

/// Writable endpoint that bulk-inserts rows into one collection
///
/// Rows are handed to a background writer through a bounded channel, so
/// [`send`](WriteSink::send) waits whenever the writer falls behind. Structure
/// records are accepted and ignored. Call [`close`](WriteSink::close) to flush
/// the last partial batch and learn whether every row was written.
pub struct WriteSink {
    collection: String,
    sender: Option<mpsc::Sender<Record>>,
    worker: Option<JoinHandle<Result<WriteSummary>>>,
}

impl WriteSink {
    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_none()
    }

    /// Queue a record for writing
    ///
    /// Fails once the sink is closed, or when the writer has already stopped
    /// on an error (that error is returned here and the sink closes).
    pub async fn send(&mut self, record: Record) -> Result<()> {
        let Some(sender) = &self.sender else {
            return Err(self.closed_error());
        };

        if sender.send(record).await.is_ok() {
            return Ok(());
        }

        // Receiver is gone: the writer exited early
        self.sender = None;
        match self.join_worker().await {
            Err(err) => Err(err),
            Ok(_) => Err(DriverError::Stream(format!(
                "writer for '{}' stopped unexpectedly",
                self.collection
            ))),
        }
    }

    pub async fn send_row(&mut self, row: Document) -> Result<()> {
        self.send(Record::Row(row)).await
    }

    /// Flush pending rows and wait for the writer to finish
    pub async fn close(&mut self) -> Result<WriteSummary> {
        if self.sender.take().is_none() {
            return Err(self.closed_error());
        }
        let summary = self.join_worker().await?;
        info!(
            "Write stream to '{}' closed: {} rows in {} batches",
            self.collection, summary.inserted, summary.batches
        );
        Ok(summary)
    }

    async fn join_worker(&mut self) -> Result<WriteSummary> {
        let Some(worker) = self.worker.take() else {
            return Err(self.closed_error());
        };
        match worker.await {
            Ok(result) => result,
            Err(err) => Err(DriverError::Stream(format!(
                "writer for '{}' aborted: {}",
                self.collection, err
            ))),
        }
    }

    fn closed_error(&self) -> DriverError {
        DriverError::Stream(format!("write stream to '{}' is closed", self.collection))
    }
}

impl Drop for WriteSink {
    fn drop(&mut self) {
        if self.sender.is_some() {
            warn!(
                "Write stream to '{}' dropped without close, queued rows are flushed unobserved",
                self.collection
            );
        }
    }
}

/// Open a write stream into `collection`
///
/// `drop_if_exists` (or else `truncate`) is applied before this returns, so a
/// failure there surfaces immediately. Must be called from within a Tokio
/// runtime.
pub async fn open_write_stream(
    conn: &Connection,
    collection: &str,
    options: WriteTableOptions,
    config: &StreamConfig,
) -> Result<WriteSink> {
    let store = conn.shared_store();

    if options.drop_if_exists {
        debug!("Dropping '{}' before write", collection);
        store
            .drop_collection(collection)
            .await
            .map_err(|e| e.into_stream())?;
    } else if options.truncate {
        let removed = store
            .delete_many(collection, Document::new())
            .await
            .map_err(|e| e.into_stream())?;
        debug!("Truncated '{}' before write, {} documents removed", collection, removed);
    }

    let (sender, receiver) = mpsc::channel(config.write_buffer.max(1));
    let worker = tokio::spawn(write_rows(
        store,
        collection.to_string(),
        config.write_batch_size.max(1),
        receiver,
    ));

    Ok(WriteSink {
        collection: collection.to_string(),
        sender: Some(sender),
        worker: Some(worker),
    })
}

async fn write_rows(
    store: Arc<dyn DocumentStore>,
    collection: String,
    batch_size: usize,
    mut receiver: mpsc::Receiver<Record>,
) -> Result<WriteSummary> {
    let mut summary = WriteSummary::default();
    let mut batch = Vec::with_capacity(batch_size);

    while let Some(record) = receiver.recv().await {
        match record {
            Record::Structure(structure) => {
                debug!("Write stream to '{}' got structure with {} keys", collection, structure.len());
            }
            Record::Row(row) => {
                batch.push(row);
                if batch.len() >= batch_size {
                    flush(store.as_ref(), &collection, &mut batch, &mut summary).await?;
                }
            }
        }
    }

    flush(store.as_ref(), &collection, &mut batch, &mut summary).await?;
    Ok(summary)
}

async fn flush(
    store: &dyn DocumentStore,
    collection: &str,
    batch: &mut Vec<Document>,
    summary: &mut WriteSummary,
) -> Result<()> {
    if batch.is_empty() {
        return Ok(());
    }

    let rows = std::mem::take(batch);
    let count = rows.len();
    let written = store.insert_many(collection, rows).await.map_err(|e| {
        error!("Bulk insert of {} rows into '{}' failed: {}", count, collection, e);
        e.into_stream()
    })?;

    summary.inserted += written;
    summary.batches += 1;
    Ok(())
}
