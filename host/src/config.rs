//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `host.toml`.
//!     loads configuration from file or falls back to defaults.
//!
//! structure:
//!     - ServerConfig: where the ingestion/export api listens.
//!     - GeneratorConfig: tick cadence and how batches reach the store.
//!     - RefreshConfig: how often the dashboard snapshot is taken.
//!     - RetentionConfig: optional eviction bounds (unbounded by default).
//!     - LoggingConfig: log level and per-tick data echo.
//!
//! ==============================================================================

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::store::RetentionPolicy;

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct HostConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_addr: "0.0.0.0:5000".to_string() }
    }
}

/// how the generator hands batches to the ingestion side
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    /// bounded tokio channel drained by the ingestion worker
    #[default]
    InProcess,
    /// POST to `hub_url`, like a remote sensor node would
    Http,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeneratorConfig {
    pub enabled: bool,
    pub interval_ms: u64,
    pub transport: Transport,
    pub hub_url: String,
    pub queue_capacity: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 1000,
            transport: Transport::InProcess,
            hub_url: "http://localhost:5000/data".to_string(),
            queue_capacity: 64,
        }
    }
}

impl GeneratorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RefreshConfig {
    pub interval_ms: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self { interval_ms: 1000 }
    }
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RetentionConfig {
    pub max_records: Option<usize>,
    pub max_age_seconds: Option<u64>,
}

impl RetentionConfig {
    pub fn policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            max_records: self.max_records,
            max_age: self.max_age_seconds.map(Duration::from_secs),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub show_sensor_data: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), show_sensor_data: true }
    }
}

impl HostConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

        Self::parse(&content)
    }

    /// Parse configuration from toml text
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: HostConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config: {}", e))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.generator.interval_ms == 0 {
            anyhow::bail!("generator.interval_ms must be greater than zero");
        }
        if self.refresh.interval_ms == 0 {
            anyhow::bail!("refresh.interval_ms must be greater than zero");
        }
        if self.generator.queue_capacity == 0 {
            anyhow::bail!("generator.queue_capacity must be greater than zero");
        }
        if self.retention.max_records == Some(0) {
            anyhow::bail!("retention.max_records must be greater than zero when set");
        }
        Ok(())
    }

    /// Load with default fallback
    pub fn load_or_default() -> Self {
        let paths = [
            std::path::PathBuf::from("config").join("host.toml"),
            std::path::PathBuf::from("..").join("config").join("host.toml"),
        ];

        for path in &paths {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        println!("[CONFIG] Loaded from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        println!("[CONFIG] Warning: Failed to load {}: {}", path.display(), e);
                    }
                }
            }
        }

        println!("[CONFIG] Warning: No config file found - using defaults");
        Self::default()
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        let transport = match self.generator.transport {
            Transport::InProcess => "in-process",
            Transport::Http => "http",
        };
        let retention = match (self.retention.max_records, self.retention.max_age_seconds) {
            (None, None) => "unbounded".to_string(),
            (records, age) => format!(
                "records={} age={}",
                records.map_or("-".to_string(), |r| r.to_string()),
                age.map_or("-".to_string(), |a| format!("{}s", a)),
            ),
        };

        println!("┌─────────────────────────────────────────┐");
        println!("│           HUB CONFIGURATION             │");
        println!("├─────────────────────────────────────────┤");
        println!("│ Listen: {}", self.server.bind_addr);
        println!("│ Generator: {} ({}ms, {})", self.generator.enabled, self.generator.interval_ms, transport);
        println!("│ Refresh Interval: {}ms", self.refresh.interval_ms);
        println!("│ Retention: {}", retention);
        println!("│ Log Level: {}", self.logging.level);
        println!("└─────────────────────────────────────────┘");
    }
}
