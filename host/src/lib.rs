//! sensor hub: a simulated environmental sensor node and the in-memory hub
//! that ingests, charts and exports its readings.
//!
//! the pipeline is generator -> transport -> ingest -> store, with the refresh
//! loop and the export route reading snapshots of the store.

pub mod config;
pub mod domain;
pub mod error;
pub mod export;
pub mod generator;
pub mod ingest;
pub mod refresh;
pub mod server;
pub mod store;
pub mod transport;

pub use domain::{Batch, Channel, Reading};
pub use error::{HubError, HubResult};
pub use store::{SharedStore, Snapshot};
