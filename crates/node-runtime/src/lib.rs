//! # Node Runtime
//!
//! Development node: an in-memory chain fed by a timed block producer and
//! served over the chain RPC facade.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (file, then environment)
//! 2. Initialize logging
//! 3. Create the genesis chain
//! 4. Spawn the block producer
//! 5. Serve RPC until shutdown is signalled

#![allow(missing_docs)]

pub mod config;
pub mod dev_chain;
pub mod logging;

pub use config::{load_config, load_config_with, DevChainConfig, NodeConfig, NodeConfigError};
pub use dev_chain::BlockProducer;
pub use logging::{init_logging, LoggingError};

use chain_rpc::{ChainState, InMemoryChainState, RpcService, ServiceError};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

/// The node: chain state, producer and RPC service.
pub struct NodeRuntime {
    config: NodeConfig,
    chain: Arc<InMemoryChainState>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl NodeRuntime {
    pub fn new(config: NodeConfig) -> Self {
        let chain = Arc::new(InMemoryChainState::with_genesis());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            config,
            chain,
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub fn chain(&self) -> Arc<InMemoryChainState> {
        Arc::clone(&self.chain)
    }

    /// Signal every task to stop.
    pub fn shutdown(&self) {
        info!("Initiating graceful shutdown...");
        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }
    }

    /// Bind the configured address and run until shutdown.
    pub async fn run(&self) -> Result<(), ServiceError> {
        let listener = TcpListener::bind(self.config.rpc.addr())
            .await
            .map_err(ServiceError::Bind)?;
        self.serve(listener).await
    }

    /// Run on an already-bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServiceError> {
        let service = RpcService::new(self.config.rpc.clone(), self.chain.clone())?;

        info!(
            best = self.chain.best_head().number,
            block_time_ms = self.config.dev_chain.block_time_ms,
            "Starting node runtime"
        );

        let producer = BlockProducer::new(self.chain.clone(), self.config.dev_chain.clone());
        let producer = tokio::spawn(producer.run(self.shutdown_rx.clone()));

        let mut rx = self.shutdown_rx.clone();
        let signal = async move {
            loop {
                if *rx.borrow_and_update() {
                    break;
                }
                // A dropped sender also stops the server
                if rx.changed().await.is_err() {
                    break;
                }
            }
        };

        let result = service.serve(listener, signal).await;

        // The server can fail before shutdown was requested
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = producer.await {
            error!(error = %e, "Block producer task failed");
        }

        info!("Shutdown complete");
        result
    }
}
