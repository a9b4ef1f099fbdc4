//! ==============================================================================
//! main.rs - sensor hub entry point
//! ==============================================================================
//!
//! purpose:
//!     runs a simulated environmental sensor node and the hub that collects
//!     its readings in one process. readings stay in memory for the life of
//!     the process and are served for live charts and bulk export.
//!
//! responsibilities:
//!     - load configuration (config.rs)
//!     - create the shared store (store.rs)
//!     - serve the ingestion/export api (server.rs)
//!     - run the dashboard refresh loop (refresh.rs)
//!     - run the generator and its transport (generator.rs, transport.rs, ingest.rs)
//!
//! architecture:
//!
//!     ┌──────────────────────────────────────────────────────────────┐
//!     │                        hub (this file)                        │
//!     │  ┌─────────────┐   mpsc    ┌─────────────┐                    │
//!     │  │ generator   │ ────────> │ ingest      │                    │
//!     │  │ (1s cycle)  │  or http  │ worker      │                    │
//!     │  └─────────────┘     │     └──────┬──────┘                    │
//!     │                      ▼            │                           │
//!     │               ┌─────────────┐     │     ┌─────────────────┐   │
//!     │               │ web server  │ ────┤     │ refresh loop    │   │
//!     │               │ (port 5000) │     │     │ (1s cycle)      │   │
//!     │               └─────────────┘     ▼     └────────┬────────┘   │
//!     │                             ┌───────────┐        │            │
//!     │                             │   store   │ <──────┘            │
//!     │                             └───────────┘                     │
//!     │         (Clone-able handle around Arc<RwLock<..>>)            │
//!     └──────────────────────────────────────────────────────────────┘
//!
//! nothing here is cancellable: every task runs until the process exits.
//!
//! ==============================================================================

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use sensor_hub::config::{GeneratorConfig, HostConfig, Transport};
use sensor_hub::generator::{self, Generator};
use sensor_hub::refresh::{self, DashboardFeed};
use sensor_hub::server::{self, AppState};
use sensor_hub::transport::{HttpSink, InProcessSink};
use sensor_hub::{ingest, SharedStore};

/// request timeout for the http transport
const HTTP_SEND_TIMEOUT: Duration = Duration::from_secs(5);

// ==============================================================================
// main entry point
// ==============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // startup banner
    println!("===========================================================");
    println!("  Sensor Hub - simulated environmental monitoring");
    println!("===========================================================");

    // step 1: load configuration
    let config = HostConfig::load_or_default();
    init_tracing(&config.logging.level);
    config.print_summary();

    // step 2: initialize shared state
    let store = SharedStore::new(config.retention.policy());
    let feed = DashboardFeed::new();

    // step 3: start the web server in background
    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_addr))?;
    tracing::info!("[STARTUP] ✓ API live at http://{}", config.server.bind_addr);

    let web_state = AppState { store: store.clone(), feed: feed.clone() };
    let server = tokio::spawn(server::run_server(listener, web_state));

    // step 4: dashboard refresh loop
    tokio::spawn(refresh::run(store.clone(), feed, config.refresh.interval()));

    // step 5: sensor generator
    if config.generator.enabled {
        spawn_generator(&config.generator, store, config.logging.show_sensor_data)?;
    } else {
        tracing::info!("[STARTUP] Generator disabled, waiting for remote nodes");
    }

    server.await.context("web server task panicked")?
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn spawn_generator(config: &GeneratorConfig, store: SharedStore, show_data: bool) -> Result<()> {
    let node = Generator::new(StdRng::from_os_rng());
    let interval = config.interval();

    match config.transport {
        Transport::InProcess => {
            let (sink, rx) = InProcessSink::channel(config.queue_capacity);
            tokio::spawn(ingest::run_worker(rx, store));
            tokio::spawn(generator::run(node, sink, interval, show_data));
        }
        Transport::Http => {
            let sink = HttpSink::new(config.hub_url.clone(), HTTP_SEND_TIMEOUT)
                .context("failed to build http client")?;
            tracing::info!("[STARTUP] Generator pushing to {}", config.hub_url);
            tokio::spawn(generator::run(node, sink, interval, show_data));
        }
    }

    Ok(())
}
