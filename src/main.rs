//! balancerd — least-loaded HTTP load balancer.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────────────────────────────┐
//!                  │                  BALANCERD                   │
//!                  │                                              │
//!  Client Request  │  ┌─────────┐   ┌──────────────┐              │
//!  ────────────────┼─▶│  http   │──▶│load_balancer │              │
//!                  │  │ server  │   │ (least conn) │              │
//!                  │  └─────────┘   └──────┬───────┘              │
//!                  │                       │                      │
//!  Client Response │  ┌─────────┐   ┌──────▼───────┐              │
//!  ◀───────────────┼──│ tracked │◀──│    hyper     │◀─────────────┼── Backend
//!                  │  │  body   │   │    client    │              │    Servers
//!                  │  └─────────┘   └──────────────┘              │
//!                  │                                              │
//!                  │  ┌────────────────────────────────────────┐  │
//!                  │  │          Cross-Cutting Concerns        │  │
//!                  │  │  config · health probes (1 task per    │  │
//!                  │  │  backend) · observability · lifecycle  │  │
//!                  │  └────────────────────────────────────────┘  │
//!                  └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use balancerd::config;
use balancerd::http::HttpServer;
use balancerd::lifecycle::{signals, Shutdown};
use balancerd::observability::{logging, metrics};

#[derive(Debug, Parser)]
#[command(name = "balancerd", version, about = "Least-loaded HTTP load balancer")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "balancerd.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Bad configuration is fatal: nothing is served until it loads cleanly.
    let config = config::load_config(&args.config)?;

    logging::init(&config.observability);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        backends = config.servers.len(),
        health_interval = ?config.health_check.interval,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => {
                tracing::error!(
                    metrics_address = %config.observability.metrics_address,
                    error = %e,
                    "Failed to parse metrics address"
                );
            }
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(config);
    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
