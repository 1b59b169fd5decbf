//! Timed block producer for the dev chain.

use crate::config::DevChainConfig;
use chain_rpc::InMemoryChainState;
use shared_types::{BlockRef, Bytes};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Produces one block per tick and advances finality behind it.
pub struct BlockProducer {
    chain: Arc<InMemoryChainState>,
    config: DevChainConfig,
}

impl BlockProducer {
    pub fn new(chain: Arc<InMemoryChainState>, config: DevChainConfig) -> Self {
        Self { chain, config }
    }

    /// Import one block and finalize `best - finality_lag`.
    pub fn produce(&self) -> BlockRef {
        let head = self.chain.import_block(vec![timestamp_extrinsic()]);

        if let Some(target) = head.number.checked_sub(self.config.finality_lag) {
            match self.chain.finalize_number(target) {
                Ok(finalized) => debug!(number = finalized.number, "Advanced finality"),
                Err(e) => warn!(error = %e, "Failed to advance finality"),
            }
        }
        head
    }

    /// Produce blocks until `shutdown` flips to `true`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.block_time());
        // The first tick completes immediately
        ticker.tick().await;

        info!(
            block_time_ms = self.config.block_time_ms,
            finality_lag = self.config.finality_lag,
            "Block producer started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let head = self.produce();
                    info!(number = head.number, hash = ?head.hash, "Produced block");
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Block producer stopped");
    }
}

/// Timestamp inherent: milliseconds since the epoch, little endian.
fn timestamp_extrinsic() -> Bytes {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    Bytes(millis.to_le_bytes().to_vec())
}
