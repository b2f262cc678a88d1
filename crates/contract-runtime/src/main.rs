//! Contract process entry point.

use std::sync::Arc;

use anyhow::{Context, Result};
use contract_runtime::AssetLedger;
use contract_shim::config::ShimConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Load configuration
    let config = ShimConfig::from_env().context("invalid shim configuration")?;
    info!(
        version = contract_shim::VERSION,
        peer = %config.peer_address,
        contract = %config.contract_name,
        "Starting contract runtime"
    );

    tokio::select! {
        result = contract_shim::start(Arc::new(AssetLedger), config) => {
            result.context("contract connection failed")?;
            info!("Peer closed the connection");
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl+C")?;
            warn!("Interrupted, shutting down");
        }
    }

    Ok(())
}
