//! ==============================================================================
//! generator.rs - simulated sensor node
//! ==============================================================================
//!
//! purpose:
//!     produces one batch per tick with plausible readings for every channel.
//!     temperature, humidity and vibration follow a small bounded random walk,
//!     sound is drawn fresh every tick, tilt/fire/shock stay at their seed values.
//!
//! relationships:
//!     - sends through: transport.rs (BatchSink, in-process queue or http)
//!     - spawned by: main.rs
//!
//! ==============================================================================

use crate::domain::{Batch, Channel, Reading};
use crate::transport::BatchSink;

use rand::Rng;
use std::time::Duration;

/// largest per-tick change applied to a walking channel
pub const MAX_STEP: f64 = 0.01;

pub const TEMPERATURE_RANGE: (f64, f64) = (-20.0, 50.0);
pub const HUMIDITY_RANGE: (f64, f64) = (0.0, 100.0);
pub const VIBRATION_RANGE: (f64, f64) = (0.0, 10.0);
pub const SOUND_RANGE: (f64, f64) = (0.1, 0.3);

/// format of the `time` channel
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// current value of every numeric channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorState {
    pub tilt: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub fire: f64,
    pub shock: f64,
    pub vibration: f64,
    /// bee buzz frequency in GHz
    pub sound: f64,
}

impl Default for SensorState {
    fn default() -> Self {
        Self {
            tilt: 45.0,
            temperature: 20.0,
            humidity: 50.0,
            fire: 0.0,
            shock: 5.0,
            vibration: 5.0,
            sound: 0.2,
        }
    }
}

impl SensorState {
    fn batch(&self, time: String) -> Batch {
        Batch::new()
            .with(Channel::Time, Reading::Timestamp(time))
            .with(Channel::Tilt, Reading::Value(self.tilt))
            .with(Channel::Temperature, Reading::Value(self.temperature))
            .with(Channel::Humidity, Reading::Value(self.humidity))
            .with(Channel::Fire, Reading::Value(self.fire))
            .with(Channel::Shock, Reading::Value(self.shock))
            .with(Channel::Vibration, Reading::Value(self.vibration))
            .with(Channel::Sound, Reading::Value(self.sound))
    }
}

/// per-tick deltas for the walking channels
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Step {
    pub temperature: f64,
    pub humidity: f64,
    pub vibration: f64,
}

impl Step {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            temperature: rng.random_range(-MAX_STEP..=MAX_STEP),
            humidity: rng.random_range(-MAX_STEP..=MAX_STEP),
            vibration: rng.random_range(-MAX_STEP..=MAX_STEP),
        }
    }
}

/// independent uniform draw for the acoustic channel
pub fn sample_sound<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.random_range(SOUND_RANGE.0..=SOUND_RANGE.1)
}

fn clamp(value: f64, (lo, hi): (f64, f64)) -> f64 {
    value.clamp(lo, hi)
}

pub struct Generator<R> {
    state: SensorState,
    rng: R,
}

impl<R: Rng> Generator<R> {
    pub fn new(rng: R) -> Self {
        Self::with_state(SensorState::default(), rng)
    }

    pub fn with_state(state: SensorState, rng: R) -> Self {
        Self { state, rng }
    }

    pub fn state(&self) -> &SensorState {
        &self.state
    }

    /// produce the next batch stamped with `time`
    pub fn tick(&mut self, time: String) -> Batch {
        let step = Step::random(&mut self.rng);
        let sound = sample_sound(&mut self.rng);
        self.advance(step, sound, time)
    }

    /// apply a known step and sound sample
    pub fn advance(&mut self, step: Step, sound: f64, time: String) -> Batch {
        let s = &mut self.state;
        s.temperature = clamp(s.temperature + step.temperature, TEMPERATURE_RANGE);
        s.humidity = clamp(s.humidity + step.humidity, HUMIDITY_RANGE);
        s.vibration = clamp(s.vibration + step.vibration, VIBRATION_RANGE);
        s.sound = sound;

        s.batch(time)
    }
}

/// local wall clock in the `time` channel format
pub fn wall_clock() -> String {
    chrono::Local::now().format(TIME_FORMAT).to_string()
}

/// tick forever: generate, send, log, sleep
///
/// a failed send is logged and dropped. the sleep is the same whatever the
/// send took or returned.
pub async fn run<R, S>(mut generator: Generator<R>, sink: S, interval: Duration, show_data: bool)
where
    R: Rng + Send,
    S: BatchSink,
{
    tracing::info!(interval_ms = interval.as_millis() as u64, sink = sink.name(), "generator started");

    loop {
        let batch = generator.tick(wall_clock());

        if show_data {
            let s = generator.state();
            tracing::info!(
                "[GEN] Temp: {:.3}°C | Humidity: {:.3}% | Vibration: {:.3}g | Sound: {:.3}GHz",
                s.temperature, s.humidity, s.vibration, s.sound
            );
        }

        match sink.send(batch).await {
            Ok(ack) => tracing::debug!(status = %ack.status, "batch acknowledged"),
            Err(e) => tracing::warn!("[GEN] ⚠ Send failed, dropping batch: {}", e),
        }

        tokio::time::sleep(interval).await;
    }
}
