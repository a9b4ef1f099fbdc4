//! ==============================================================================
//! refresh.rs - dashboard refresh loop
//! ==============================================================================
//!
//! purpose:
//!     on a fixed cadence, independent of ingestion, takes a snapshot of the
//!     store and hands it to the presentation side. chart styling lives outside
//!     this crate; what it gets here is one series per channel, each point
//!     pairing a value with the `time` of the record it came from.
//!
//! relationships:
//!     - reads: store.rs (SharedStore::snapshot)
//!     - feeds: server.rs (GET /api/charts serves the latest ChartFrame)
//!
//! ==============================================================================

use crate::domain::Channel;
use crate::store::{SharedStore, Snapshot};

use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;

/// the presentation collaborator
pub trait SnapshotSink: Send + Sync + 'static {
    fn present(&self, snapshot: Snapshot) -> impl Future<Output = ()> + Send;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub time: Option<String>,
    pub value: f64,
}

/// everything a chart renderer needs for one refresh
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartFrame {
    /// refresh counter, starting at 1
    pub frame: u64,
    pub records: usize,
    pub charts: BTreeMap<Channel, Vec<ChartPoint>>,
}

impl ChartFrame {
    pub fn from_snapshot(frame: u64, snapshot: &Snapshot) -> Self {
        let charts = Channel::NUMERIC
            .into_iter()
            .map(|channel| {
                let points = snapshot
                    .points(channel)
                    .into_iter()
                    .map(|(time, value)| ChartPoint { time: time.map(str::to_string), value })
                    .collect();
                (channel, points)
            })
            .collect();

        Self { frame, records: snapshot.records.len(), charts }
    }
}

/// holds the latest frame for the web server
#[derive(Clone, Default)]
pub struct DashboardFeed {
    latest: Arc<RwLock<ChartFrame>>,
}

impl DashboardFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn latest(&self) -> ChartFrame {
        self.latest.read().await.clone()
    }
}

impl SnapshotSink for DashboardFeed {
    async fn present(&self, snapshot: Snapshot) {
        let mut latest = self.latest.write().await;
        let next = latest.frame + 1;
        *latest = ChartFrame::from_snapshot(next, &snapshot);
    }
}

/// poll the store forever, handing each snapshot to `sink`
pub async fn run<S: SnapshotSink>(store: SharedStore, sink: S, period: Duration) {
    tracing::info!(interval_ms = period.as_millis() as u64, "dashboard refresh started");

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let snapshot = store.snapshot().await;
        tracing::trace!(records = snapshot.records.len(), "refresh");
        sink.present(snapshot).await;
    }
}
