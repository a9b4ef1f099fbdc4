//! ==============================================================================
//! store.rs - in-memory time-series store
//! ==============================================================================
//!
//! purpose:
//!     holds every ingested batch for the lifetime of the process.
//!     each batch becomes one Record; per-channel sequences are views over the
//!     records that carried that channel. a partial batch therefore never shifts
//!     one channel against another in export rows or chart points.
//!
//! relationships:
//!     - written by: ingest.rs (in-process worker), server.rs (POST /data)
//!     - read by: refresh.rs (dashboard frames), export.rs (GET /export), server.rs (GET /api)
//!
//! sharing:
//!     SharedStore is a Clone-able handle around Arc<RwLock<TimeSeriesStore>>.
//!     a whole batch is appended under one write lock, so readers never see
//!     half of a batch and racing writers interleave only batch by batch.
//!
//! ==============================================================================

use crate::domain::{Batch, Channel, Reading};

use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// optional eviction bounds; the default keeps everything
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub max_records: Option<usize>,
    /// applied on every append and before every `SharedStore::snapshot`,
    /// so stale records go away even when ingestion has stopped
    pub max_age: Option<Duration>,
}

impl RetentionPolicy {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_records.is_none() && self.max_age.is_none()
    }
}

/// one ingested batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    /// ingestion order, starting at 0
    pub seq: u64,
    /// unix timestamp (ms) when the batch was appended
    pub received_at_ms: u64,
    pub readings: Batch,
}

impl Record {
    pub fn get(&self, channel: Channel) -> Option<&Reading> {
        self.readings.get(channel)
    }

    pub fn time(&self) -> Option<&str> {
        self.get(Channel::Time).and_then(Reading::as_timestamp)
    }
}

#[derive(Debug, Default)]
pub struct TimeSeriesStore {
    records: VecDeque<Record>,
    channel_lengths: BTreeMap<Channel, usize>,
    next_seq: u64,
    retention: RetentionPolicy,
}

impl TimeSeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retention: RetentionPolicy) -> Self {
        Self { retention, ..Self::default() }
    }

    /// append one batch as a record. empty batches are not stored.
    pub fn append(&mut self, batch: Batch) -> bool {
        self.append_at(batch, now_ms())
    }

    /// append a single reading as its own record
    pub fn append_reading(&mut self, channel: Channel, reading: Reading) -> bool {
        self.append(Batch::new().with(channel, reading))
    }

    fn append_at(&mut self, batch: Batch, received_at_ms: u64) -> bool {
        if batch.is_empty() {
            return false;
        }

        for (channel, _) in batch.iter() {
            *self.channel_lengths.entry(channel).or_default() += 1;
        }

        self.records.push_back(Record { seq: self.next_seq, received_at_ms, readings: batch });
        self.next_seq += 1;

        self.evict(received_at_ms);
        true
    }

    /// drop records that have outlived `max_age`
    pub fn expire(&mut self) {
        self.evict(now_ms());
    }

    fn evict(&mut self, now_ms: u64) {
        if self.retention.is_unbounded() {
            return;
        }

        let max_age_ms = self.retention.max_age.map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
        while let Some(oldest) = self.records.front() {
            let over_count = self.retention.max_records.is_some_and(|max| self.records.len() > max);
            let too_old = max_age_ms.is_some_and(|age| now_ms.saturating_sub(oldest.received_at_ms) > age);
            if !(over_count || too_old) {
                break;
            }

            if let Some(evicted) = self.records.pop_front() {
                for (channel, _) in evicted.readings.iter() {
                    if let Some(len) = self.channel_lengths.get_mut(&channel) {
                        *len -= 1;
                    }
                }
            }
        }
    }

    /// number of stored readings for a channel
    pub fn len(&self, channel: Channel) -> usize {
        self.channel_lengths.get(&channel).copied().unwrap_or(0)
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// batches appended over the process lifetime, including evicted ones
    pub fn total_ingested(&self) -> u64 {
        self.next_seq
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            records: self.records.iter().cloned().collect(),
            total_ingested: self.next_seq,
        }
    }
}

/// point-in-time copy of the store
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub records: Vec<Record>,
    pub total_ingested: u64,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn latest(&self) -> Option<&Record> {
        self.records.last()
    }

    /// the channel's sequence in ingestion order
    pub fn series(&self, channel: Channel) -> impl Iterator<Item = &Reading> + '_ {
        self.records.iter().filter_map(move |r| r.get(channel))
    }

    pub fn len(&self, channel: Channel) -> usize {
        self.series(channel).count()
    }

    pub fn values(&self, channel: Channel) -> Vec<f64> {
        self.series(channel).filter_map(Reading::as_f64).collect()
    }

    /// `(time, value)` pairs taken from the same record
    pub fn points(&self, channel: Channel) -> Vec<(Option<&str>, f64)> {
        self.records
            .iter()
            .filter_map(|r| r.get(channel).and_then(Reading::as_f64).map(|v| (r.time(), v)))
            .collect()
    }

    pub fn channel_lengths(&self) -> BTreeMap<Channel, usize> {
        Channel::ALL.into_iter().map(|c| (c, self.len(c))).collect()
    }
}

/// Clone-able handle shared by the generator side, the api and the refresh loop
#[derive(Clone, Debug, Default)]
pub struct SharedStore {
    inner: Arc<RwLock<TimeSeriesStore>>,
}

impl SharedStore {
    pub fn new(retention: RetentionPolicy) -> Self {
        Self { inner: Arc::new(RwLock::new(TimeSeriesStore::with_retention(retention))) }
    }

    pub async fn append(&self, batch: Batch) -> bool {
        self.inner.write().await.append(batch)
    }

    pub async fn snapshot(&self) -> Snapshot {
        {
            let guard = self.inner.read().await;
            if guard.retention.max_age.is_none() {
                return guard.snapshot();
            }
        }

        let mut guard = self.inner.write().await;
        guard.expire();
        guard.snapshot()
    }

    pub async fn len(&self, channel: Channel) -> usize {
        self.inner.read().await.len(channel)
    }
}

fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}
