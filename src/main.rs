//! Shipment tracker - lifecycle engine behind a small HTTP API
//!
//! Module structure:
//! - `domain/` - Core business types (Shipment, Milestone, statuses, errors)
//! - `services/` - Lifecycle rules, tracking codes, store, service
//! - `io/` - HTTP API, request validation, Prometheus rendering
//! - `infra/` - Infrastructure (Config, Metrics)

use anyhow::Context;
use clap::Parser;
use shipment_tracker::infra::{Config, Metrics};
use shipment_tracker::io::{start_api_server, ApiState};
use shipment_tracker::services::{ShipmentService, ShipmentStore, TrackingCodeGenerator};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Shipment tracker - shipment lifecycle API
#[derive(Parser, Debug)]
#[command(name = "shipment-tracker", version, about)]
struct Args {
    /// Path to TOML configuration file (falls back to CONFIG_FILE, then config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!("shipment-tracker starting");

    let args = Args::parse();
    let config_path = Config::resolve_config_path(args.config.as_deref());
    let config = Config::load_from_path(&config_path);

    info!(
        config_file = %config.config_file(),
        site_id = %config.site_id(),
        bind_address = %config.bind_address(),
        port = %config.port(),
        max_code_attempts = %config.max_code_attempts(),
        metrics_interval_secs = %config.metrics_interval_secs(),
        "config_loaded"
    );

    let addr: SocketAddr = format!("{}:{}", config.bind_address(), config.port())
        .parse()
        .with_context(|| format!("Invalid server address {}:{}", config.bind_address(), config.port()))?;

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Composition root: one store shared by the service
    let metrics = Arc::new(Metrics::new());
    let store = Arc::new(ShipmentStore::new());
    let service = ShipmentService::with_metrics(store, metrics.clone())
        .with_codes(TrackingCodeGenerator::new(config.max_code_attempts()));
    let state = Arc::new(ApiState::new(service, metrics.clone(), config.site_id()));

    // Start metrics reporter
    let metrics_interval = config.metrics_interval_secs();
    let mut reporter_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(metrics_interval));
        loop {
            tokio::select! {
                _ = interval.tick() => metrics.report().log(),
                _ = reporter_shutdown.changed() => break,
            }
        }
    });

    // Handle shutdown on Ctrl+C
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_tx.send(true);
    });

    // Serve until shutdown
    start_api_server(addr, state, shutdown_rx).await?;

    info!("shipment-tracker shutdown complete");
    Ok(())
}
