//! Development node binary.

use anyhow::{Context, Result};
use node_runtime::{init_logging, load_config, NodeRuntime};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config().context("Failed to load configuration")?;
    init_logging(&config.rpc.logging).context("Failed to initialize logging")?;

    info!("===========================================");
    info!("  Chain RPC dev node v{}", env!("CARGO_PKG_VERSION"));
    info!("  RPC: {}", config.rpc.addr());
    info!("===========================================");

    let runtime = Arc::new(NodeRuntime::new(config));

    let signal_runtime = Arc::clone(&runtime);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_runtime.shutdown();
        }
    });

    info!("Node is running. Press Ctrl+C to stop.");
    runtime.run().await.context("RPC service failed")?;
    Ok(())
}
