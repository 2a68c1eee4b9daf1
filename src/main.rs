//! Pipeframe API Server
//!
//! Run with: cargo run --bin pipeframe [-- --config path/to/config.toml]
//!
//! # Configuration
//!
//! Loaded from the first of `~/.config/pipeframe/config.toml`,
//! `/etc/pipeframe/config.toml` and `./config.toml`, then overridden by
//! `PIPEFRAME_*` environment variables. `RUST_LOG` overrides the log level.

use anyhow::Context;
use clap::Parser;
use pipeframe::api::{serve, AppState};
use pipeframe::config::Config;
use pipeframe::logging::init_tracing;
use pipeframe::query::QueryExecutor;
use pipeframe::upstream::{PipeClient, PipeSource};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "pipeframe")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "REST server turning analytics pipe results into data frames")]
struct Args {
    /// Config file (default: search the standard locations)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match args.config {
        Some(path) => Config::load_with_env(&path)?,
        None => Config::load_default(),
    };

    init_tracing(&config.logging);

    tracing::info!("Starting Pipeframe API server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(upstream = ?config.upstream, "Upstream configured");

    let client = PipeClient::new(config.upstream.client_config())
        .context("invalid upstream configuration")?;
    let client = Arc::new(client);

    // Check the upstream once so a bad token shows up at startup
    let health = client.health_check().await;
    if health.is_healthy() {
        tracing::info!("Upstream connection verified");
    } else {
        tracing::warn!("Upstream not healthy: {} (queries will fail until it is)", health.message);
    }

    let executor = QueryExecutor::new(client, config.query.executor_options());
    let state = AppState::new(Arc::new(executor), config.api.clone());

    tracing::info!("Starting server on {}:{}", config.api.host, config.api.port);
    serve(state, &config.api).await?;

    tracing::info!("Pipeframe API server stopped");
    Ok(())
}
