//! ==============================================================================
//! transport.rs - how the generator reaches the ingestion side
//! ==============================================================================
//!
//! purpose:
//!     abstracts the hop between the generator and the store, in the same way
//!     a hardware provider hides whether it talks to a real pin or a mock.
//!
//!   - InProcessSink: bounded tokio queue + oneshot ack, used when generator
//!     and hub share a process (the default)
//!   - HttpSink: POST to a hub's /data route, used when the generator runs
//!     as a separate sensor node
//!
//! neither sink retries. the caller decides what to do with an error.
//!
//! ==============================================================================

use crate::domain::Batch;
use crate::error::{HubError, HubResult};
use crate::ingest::{Ack, IngestRequest};

use std::future::Future;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

pub trait BatchSink: Send + Sync + 'static {
    /// short label for logs
    fn name(&self) -> &'static str;

    /// deliver one batch and wait for the hub's acknowledgment
    fn send(&self, batch: Batch) -> impl Future<Output = HubResult<Ack>> + Send;
}

// ==============================================================================================
// IN-PROCESS
// ==============================================================================================

#[derive(Clone)]
pub struct InProcessSink {
    tx: mpsc::Sender<IngestRequest>,
}

impl InProcessSink {
    /// create the sink together with the receiver the ingestion worker drains
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<IngestRequest>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

impl BatchSink for InProcessSink {
    fn name(&self) -> &'static str {
        "in-process"
    }

    async fn send(&self, batch: Batch) -> HubResult<Ack> {
        let (reply, ack) = oneshot::channel();
        self.tx
            .send(IngestRequest { batch, reply })
            .await
            .map_err(|_| HubError::QueueClosed)?;
        ack.await.map_err(|_| HubError::QueueClosed)
    }
}

// ==============================================================================================
// HTTP
// ==============================================================================================

pub struct HttpSink {
    client: reqwest::Client,
    url: String,
}

impl HttpSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> HubResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url: url.into() })
    }
}

impl BatchSink for HttpSink {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn send(&self, batch: Batch) -> HubResult<Ack> {
        let response = self.client.post(&self.url).json(&batch).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(HubError::Rejected(status.as_u16()));
        }

        Ok(response.json::<Ack>().await?)
    }
}
