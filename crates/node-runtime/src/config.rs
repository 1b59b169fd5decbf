//! Node configuration.
//!
//! The RPC section is [`RpcConfig`]; the node adds the dev chain settings.
//! Sources, lowest priority first: defaults, the JSON file named by
//! `CHAIN_RPC_CONFIG`, environment variables.

use chain_rpc::domain::ConfigError;
use chain_rpc::RpcConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Complete node configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// RPC service configuration.
    pub rpc: RpcConfig,
    /// Dev chain block production.
    pub dev_chain: DevChainConfig,
}

/// Dev chain block production.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DevChainConfig {
    /// Milliseconds between produced blocks.
    pub block_time_ms: u64,
    /// Finalized head trails the best head by this many blocks.
    pub finality_lag: u64,
}

impl Default for DevChainConfig {
    fn default() -> Self {
        Self {
            block_time_ms: 6000,
            finality_lag: 2,
        }
    }
}

impl DevChainConfig {
    pub fn block_time(&self) -> Duration {
        Duration::from_millis(self.block_time_ms)
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum NodeConfigError {
    /// RPC section invalid or unreadable.
    #[error(transparent)]
    Rpc(#[from] ConfigError),
    /// Environment variable could not be parsed.
    #[error("invalid value for {key}: {value}")]
    InvalidEnv { key: &'static str, value: String },
    /// Block time of zero.
    #[error("dev_chain.block_time_ms cannot be 0")]
    ZeroBlockTime,
}

impl NodeConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), NodeConfigError> {
        self.rpc.validate()?;
        if self.dev_chain.block_time_ms == 0 {
            return Err(NodeConfigError::ZeroBlockTime);
        }
        Ok(())
    }
}

/// Load configuration from the process environment.
pub fn load_config() -> Result<NodeConfig, NodeConfigError> {
    load_config_with(|key| std::env::var(key).ok())
}

/// Load configuration reading variables through `lookup`.
pub fn load_config_with<F>(lookup: F) -> Result<NodeConfig, NodeConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = NodeConfig::default();

    if let Some(path) = lookup("CHAIN_RPC_CONFIG").map(PathBuf::from) {
        let raw = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        config = serde_json::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
    }

    config.rpc.apply_env(&lookup)?;

    if let Some(value) = lookup("DEV_BLOCK_TIME_MS") {
        config.dev_chain.block_time_ms = parse_env("DEV_BLOCK_TIME_MS", value)?;
    }
    if let Some(value) = lookup("DEV_FINALITY_LAG") {
        config.dev_chain.finality_lag = parse_env("DEV_FINALITY_LAG", value)?;
    }

    config.validate()?;
    Ok(config)
}

fn parse_env(key: &'static str, value: String) -> Result<u64, NodeConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| NodeConfigError::InvalidEnv { key, value })
}
