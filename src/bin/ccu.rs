//! `ccu` binary entry point: parses CLI args (including the session-prep
//! mode), loads config, drives the CCU client core until shutdown.
//! Exits non-zero if configuration load fails or no target ever became
//! Active, per §6's exit-code contract.

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;

use radar_link_emu::ccu;
use radar_link_emu::cli::CcuArgs;
use radar_link_emu::config::load_ccu_config;
use radar_link_emu::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CcuArgs::parse();
    logging::init(args.verbose);

    let config = load_ccu_config(&args.config).context("failed to load CCU configuration")?;
    tracing::info!(mode = %args.mode, targets = config.targets.len(), "CCU configuration loaded");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(wait_for_signal(shutdown_tx));

    let active_count = ccu::run(config, args.mode, shutdown_rx).await;
    if active_count == 0 {
        anyhow::bail!("no RSM targets could be connected");
    }

    tracing::info!("CCU shut down cleanly");
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
