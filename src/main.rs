//! USD/MXN exchange rate service.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────┐
//!                     │                  RATES SERVICE                    │
//!                     │                                                   │
//!   Client Request    │  ┌─────────┐    ┌──────────────┐    ┌─────────┐  │
//!   ──────────────────┼─▶│  http   │───▶│ RateService  │───▶│  cache  │  │
//!                     │  │ server  │    │ (cache-aside)│    │ (Redis) │  │
//!                     │  └─────────┘    └──────┬───────┘    └─────────┘  │
//!                     │                        │                          │
//!                     │                        ▼                          │
//!                     │                ┌──────────────┐    ┌───────────┐ │
//!                     │                │circuit breaker│──▶│ upstream  │─┼──▶ Banxico
//!                     │                └──────────────┘    │  client   │ │
//!                     │                                    └───────────┘ │
//!                     │  ┌────────────────────────────────────────────┐  │
//!                     │  │ config │ health │ observability │ lifecycle │  │
//!                     │  └────────────────────────────────────────────┘  │
//!                     └──────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use rates_service::config::load_config;
use rates_service::http::HttpServer;
use rates_service::lifecycle::{build_service, Shutdown};
use rates_service::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "rates-service", version, about = "USD/MXN exchange rate service")]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match load_config(Some(&args.config)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "rates-service starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        series_id = %config.upstream.series_id,
        cache_enabled = config.cache.enabled,
        database_enabled = config.database.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let service = Arc::new(build_service(&config).await?);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    shutdown.listen_for_signals();

    let server = HttpServer::new(config, service);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
