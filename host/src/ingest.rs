//! ==============================================================================
//! ingest.rs - the write side of the store
//! ==============================================================================
//!
//! purpose:
//!     one place where batches become records. both entry points end here:
//!     - POST /data (server.rs) for remote nodes
//!     - the in-process queue fed by the local generator (transport.rs)
//!
//! the ingestion path never fails for a batch it was handed. unknown channels
//! were already dropped by Batch::from_json; an empty batch is acknowledged
//! and simply not stored.
//!
//! ==============================================================================

use crate::domain::Batch;
use crate::store::SharedStore;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

pub const STATUS_SUCCESS: &str = "success";

/// confirmation payload returned to every producer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub status: String,
}

impl Ack {
    pub fn success() -> Self {
        Self { status: STATUS_SUCCESS.to_string() }
    }
}

/// append a batch and acknowledge it
pub async fn ingest(store: &SharedStore, batch: Batch) -> Ack {
    let channels = batch.len();
    let stored = store.append(batch).await;
    tracing::trace!(channels, stored, "ingested batch");
    Ack::success()
}

/// a batch queued by the local generator, with the slot for its ack
pub struct IngestRequest {
    pub batch: Batch,
    pub reply: oneshot::Sender<Ack>,
}

/// drain the in-process queue into the store until every sender is gone
pub async fn run_worker(mut rx: mpsc::Receiver<IngestRequest>, store: SharedStore) {
    tracing::info!("ingestion worker started");

    while let Some(IngestRequest { batch, reply }) = rx.recv().await {
        let ack = ingest(&store, batch).await;
        // the producer may have given up waiting; the batch is stored either way
        let _ = reply.send(ack);
    }

    tracing::info!("ingestion queue closed, worker stopping");
}
