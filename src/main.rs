//! AI Relay
//!
//! A small relay service that sits between a UI and a chat/inference
//! backend, built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                   AI RELAY                   │
//!                        │                                              │
//!   Client Request       │  ┌─────────┐    ┌──────────────────────────┐ │
//!   ─────────────────────┼─▶│  http   │───▶│ relay handler            │ │
//!                        │  │ server  │    │ parse → forward → stream │ │
//!                        │  └─────────┘    └───────────┬──────────────┘ │
//!                        │                             │                │
//!   Client Response      │  ┌──────────┐               ▼                │
//!   ◀────────────────────┼──│ response │◀────── chat backend ◀──────────┼──── Upstream
//!                        │  │stream/fb │                                │
//!                        │  └──────────┘                                │
//!                        │                                              │
//!                        │  ┌──────────────────────────────────────────┐│
//!                        │  │          Cross-Cutting Concerns          ││
//!                        │  │  ┌────────┐ ┌────────┐ ┌──────────────┐  ││
//!                        │  │  │ config │ │ health │ │observability │  ││
//!                        │  │  └────────┘ └────────┘ └──────────────┘  ││
//!                        │  └──────────────────────────────────────────┘│
//!                        └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use ai_relay::config::loader::load_config;
use ai_relay::config::watcher::ConfigWatcher;
use ai_relay::config::RelayConfig;
use ai_relay::http::HttpServer;
use ai_relay::lifecycle::Shutdown;
use ai_relay::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "ai-relay")]
#[command(about = "HTTP relay in front of a chat/inference backend", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RelayConfig::default(),
    };

    logging::init(&config.observability.log_filter);

    tracing::info!("ai-relay v0.1.0 starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.chat_url,
        health_check_enabled = config.health_check.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => {
                tracing::error!(
                    metrics_address = %config.observability.metrics_address,
                    "Failed to parse metrics address"
                );
            }
        }
    }

    // Bind TCP listener
    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(
        address = %local_addr,
        "Listening for connections"
    );

    // Watch the config file for hot reload when one was given
    let (config_updates, _watcher) = match &cli.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            let handle = watcher.run()?;
            (updates, Some(handle))
        }
        None => {
            let (_tx, updates) = mpsc::unbounded_channel();
            (updates, None)
        }
    };

    let shutdown = Shutdown::new();
    shutdown.listen_for_signals();

    let server = HttpServer::new(config);
    server
        .run(listener, config_updates, shutdown.subscribe())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
