//! `rsm` binary entry point: parses CLI args, loads config, runs the RSM
//! server core until a shutdown signal arrives.

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;

use radar_link_emu::cli::RsmArgs;
use radar_link_emu::config::load_rsm_config;
use radar_link_emu::{logging, rsm};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = RsmArgs::parse();
    logging::init(args.verbose);

    let config = load_rsm_config(&args.config).context("failed to load RSM configuration")?;
    tracing::info!(instances = config.instances.len(), "RSM configuration loaded");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(wait_for_signal(shutdown_tx));

    rsm::run(config, shutdown_rx).await;
    tracing::info!("RSM shut down cleanly");
    Ok(())
}

async fn wait_for_signal(shutdown_tx: watch::Sender<bool>) {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
            _ = terminate.recv() => tracing::info!("received SIGTERM, shutting down"),
        }
    }
    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
        tracing::info!("received Ctrl+C, shutting down");
    }

    let _ = shutdown_tx.send(true);
}
