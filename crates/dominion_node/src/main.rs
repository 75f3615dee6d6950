//! Headless cluster mirror node.
//!
//! Joins a town-sync cluster over the configured broker and keeps watch
//! on the traffic: useful as a wiring demo and as an operational probe
//! that a cluster's broker is reachable and flowing. The node runs on an
//! empty in-memory store; pointing the `Database` seam at the cluster's
//! real backing store would turn it into a live replica.

mod args;
mod config;
mod logging;
mod shutdown;

use anyhow::{Context, Result};
use args::Args;
use clap::Parser;
use dominion_sync::{BrokerType, Dominion, Locales, MemoryDatabase, Settings};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let startup = Instant::now();
    let args = Args::parse();
    logging::setup_logging(&args)?;

    info!("starting dominion mirror node v{}", env!("CARGO_PKG_VERSION"));

    let settings = config::load_config(&args)
        .await
        .with_context(|| format!("loading settings from {}", args.config.display()))?;
    let settings = config::apply_overrides(settings, &args);
    log_settings(&settings);

    if settings.cross_server && settings.broker.kind == BrokerType::Channel {
        warn!("channel broker only spans this process; a mirror needs redis to see its peers");
    }

    let node = Dominion::new(settings, Locales::default(), Arc::new(MemoryDatabase::new()));
    node.load_data(Vec::new()).await.context("loading town data")?;
    node.initialize_network(None)
        .await
        .context("connecting the broker")?;

    let shutdown_rx = shutdown::setup_shutdown_handler().await;
    let status = {
        let node = node.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(60));
            // The first tick of an interval fires immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                let towns = node.cached_towns().await.len();
                let online = node.online_users().await.len();
                info!(towns, online, "mirror replica status");
            }
        })
    };

    info!(
        "startup complete in {:.2?}; watching cluster traffic",
        startup.elapsed()
    );

    let _ = shutdown_rx.await;
    info!("shutdown signal received");
    status.abort();
    node.shutdown().await;
    info!("mirror node stopped");

    Ok(())
}

/// Logs the effective node settings.
fn log_settings(settings: &Settings) {
    info!("node configuration:");
    info!("  server name: {}", settings.server.name);
    info!("  cluster id: {}", settings.cluster.id);
    info!("  broker: {:?}", settings.broker.kind);
    info!("  cross-server sync: {}", settings.cross_server);
}
