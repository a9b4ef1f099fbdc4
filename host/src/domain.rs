//! ==============================================================================
//! domain.rs - channels, readings and batches
//! ==============================================================================
//!
//! purpose:
//!     the vocabulary shared by the generator, the ingestion path, the store
//!     and the readers. a batch is one tick worth of readings keyed by channel.
//!
//! relationships:
//!     - produced by: generator.rs (one batch per tick)
//!     - parsed by: server.rs (POST /data body -> Batch::from_json)
//!     - stored by: store.rs (one Record per ingested batch)
//!
//! ==============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// a named series of sensor readings
///
/// declaration order is the canonical column order used by export and charts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Time,
    Tilt,
    Temperature,
    Humidity,
    Fire,
    Shock,
    Vibration,
    Sound,
}

impl Channel {
    /// every known channel, in canonical order
    pub const ALL: [Channel; 8] = [
        Channel::Time,
        Channel::Tilt,
        Channel::Temperature,
        Channel::Humidity,
        Channel::Fire,
        Channel::Shock,
        Channel::Vibration,
        Channel::Sound,
    ];

    /// channels carrying numeric values (everything but `time`)
    pub const NUMERIC: [Channel; 7] = [
        Channel::Tilt,
        Channel::Temperature,
        Channel::Humidity,
        Channel::Fire,
        Channel::Shock,
        Channel::Vibration,
        Channel::Sound,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Time => "time",
            Channel::Tilt => "tilt",
            Channel::Temperature => "temperature",
            Channel::Humidity => "humidity",
            Channel::Fire => "fire",
            Channel::Shock => "shock",
            Channel::Vibration => "vibration",
            Channel::Sound => "sound",
        }
    }

    /// membership test against the known channel names
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// a single scalar reading
///
/// serialized untagged so a batch looks like `{"time": "...", "tilt": 45.0}` on the wire.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reading {
    Value(f64),
    Timestamp(String),
    /// a non-numeric value sent for a numeric channel, kept as received
    Other(Value),
}

impl Reading {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Reading::Value(v) => Some(*v),
            Reading::Timestamp(_) | Reading::Other(_) => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<&str> {
        match self {
            Reading::Timestamp(s) => Some(s),
            Reading::Value(_) | Reading::Other(_) => None,
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Value(v) => write!(f, "{}", v),
            Reading::Timestamp(s) => f.write_str(s),
            Reading::Other(Value::String(s)) => f.write_str(s),
            Reading::Other(other) => write!(f, "{}", other),
        }
    }
}

/// one tick worth of readings, at most one per channel
///
/// only serialized; incoming json goes through `Batch::from_json`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Batch {
    readings: BTreeMap<Channel, Reading>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    /// set the reading for a channel, replacing any previous one
    pub fn insert(&mut self, channel: Channel, reading: Reading) {
        self.readings.insert(channel, reading);
    }

    pub fn with(mut self, channel: Channel, reading: Reading) -> Self {
        self.insert(channel, reading);
        self
    }

    pub fn get(&self, channel: Channel) -> Option<&Reading> {
        self.readings.get(&channel)
    }

    pub fn contains(&self, channel: Channel) -> bool {
        self.readings.contains_key(&channel)
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// readings in canonical channel order
    pub fn iter(&self) -> impl Iterator<Item = (Channel, &Reading)> {
        self.readings.iter().map(|(c, r)| (*c, r))
    }

    /// build a batch from an arbitrary json object
    ///
    /// unknown channel names are skipped; every known channel is kept.
    /// `time` keeps strings as-is and stores any other json value as its text.
    /// a numeric channel holding something other than a number keeps it verbatim.
    pub fn from_json(object: &serde_json::Map<String, Value>) -> Self {
        let mut batch = Batch::new();

        for (name, value) in object {
            let Some(channel) = Channel::from_name(name) else {
                tracing::debug!(channel = %name, "ignoring unknown channel");
                continue;
            };

            let reading = match (channel, value) {
                (Channel::Time, Value::String(s)) => Reading::Timestamp(s.clone()),
                (Channel::Time, other) => Reading::Timestamp(other.to_string()),
                (_, Value::Number(n)) => match n.as_f64() {
                    Some(v) => Reading::Value(v),
                    None => Reading::Other(value.clone()),
                },
                (_, other) => {
                    tracing::debug!(%channel, value = %other, "non-numeric reading");
                    Reading::Other(other.clone())
                }
            };

            batch.insert(channel, reading);
        }

        batch
    }
}
