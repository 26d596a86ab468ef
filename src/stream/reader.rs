use super::{Record, StreamConfig};
use crate::connection::Connection;
use crate::core::{DriverError, Result};
use crate::executor::normalize_or_all;
use crate::executor::query::find_spec;
use crate::protocol::ReadRequest;
use crate::storage::DocumentStore;
use futures::{Stream, StreamExt};
use log::{debug, error};
use mongodb::bson::Document;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};
use tokio::sync::mpsc;

/// Frames on the wire between producer task and [`ReadStream`]
enum Frame {
    Record(Record),
    End,
}

/// Lazy, bounded sequence of records from one read
///
/// Yields an optional leading [`Record::Structure`], then one [`Record::Row`]
/// per document. Ends after the last row, or after a single `Err` if the store
/// fails mid-stream. Not restartable; dropping it stops the producer.
pub struct ReadStream {
    receiver: mpsc::Receiver<Result<Frame>>,
    done: bool,
}

impl ReadStream {
    /// Collect the remaining rows, skipping structure records
    pub async fn collect_rows(mut self) -> Result<Vec<Document>> {
        let mut rows = Vec::new();
        while let Some(record) = self.next().await {
            if let Record::Row(row) = record? {
                rows.push(row);
            }
        }
        Ok(rows)
    }
}

impl Stream for ReadStream {
    type Item = Result<Record>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        let item = match ready!(this.receiver.poll_recv(cx)) {
            Some(Ok(Frame::Record(record))) => return Poll::Ready(Some(Ok(record))),
            Some(Ok(Frame::End)) => None,
            Some(Err(err)) => Some(Err(err)),
            None => Some(Err(DriverError::Stream(
                "producer stopped before end of stream".to_string(),
            ))),
        };

        this.done = true;
        Poll::Ready(item)
    }
}

/// Start streaming the documents selected by `request`
///
/// The producer runs on its own Tokio task (so this must be called from within
/// a runtime) and blocks once `config.read_buffer` records are waiting.
/// `count_documents` is ignored; a stream always carries rows.
pub fn open_read_stream(
    conn: &Connection,
    request: ReadRequest,
    structure: Option<Document>,
    config: &StreamConfig,
) -> ReadStream {
    let (sender, receiver) = mpsc::channel(config.read_buffer.max(1));
    debug!(
        "Opening read stream on '{}' (connection {}, buffer {})",
        request.pure_name,
        conn.id(),
        config.read_buffer
    );

    tokio::spawn(produce(conn.shared_store(), request, structure, sender));

    ReadStream {
        receiver,
        done: false,
    }
}

async fn produce(
    store: Arc<dyn DocumentStore>,
    request: ReadRequest,
    structure: Option<Document>,
    sender: mpsc::Sender<Result<Frame>>,
) {
    if let Some(structure) = structure {
        if sender.send(Ok(Frame::Record(Record::Structure(structure)))).await.is_err() {
            return;
        }
    }

    let filter = normalize_or_all(request.condition.as_ref());
    let mut cursor = match store.find(&request.pure_name, filter, find_spec(&request)).await {
        Ok(cursor) => cursor,
        Err(err) => {
            error!("Read stream on '{}' failed to open: {}", request.pure_name, err);
            let _ = sender.send(Err(err.into_stream())).await;
            return;
        }
    };

    let mut delivered = 0u64;
    while let Some(item) = cursor.next().await {
        match item {
            Ok(row) => {
                // Suspends here while the window is full
                if sender.send(Ok(Frame::Record(Record::Row(row)))).await.is_err() {
                    debug!(
                        "Read stream on '{}' dropped by consumer after {} rows",
                        request.pure_name, delivered
                    );
                    return;
                }
                delivered += 1;
            }
            Err(err) => {
                error!(
                    "Read stream on '{}' failed after {} rows: {}",
                    request.pure_name, delivered, err
                );
                let _ = sender.send(Err(err.into_stream())).await;
                return;
            }
        }
    }

    debug!("Read stream on '{}' finished, {} rows", request.pure_name, delivered);
    let _ = sender.send(Ok(Frame::End)).await;
}
