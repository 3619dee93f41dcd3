//! Chain and node configuration: JSON file, environment overrides,
//! validation.
//!
//! Environment variables use the `TIERCHAIN_` prefix and win over the
//! file. A missing file path yields the defaults.

use crate::types::address::Address;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Configuration loading and validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("invalid value for {key}: {value}")]
    EnvOverride { key: String, value: String },
}

/// Execution-time chain parameters, fee routing included.
///
/// The four shares are percentages in `[0, 100]` summing to at most 100;
/// whatever they leave uncovered is burned.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub chain_id: u64,
    /// Seconds between block-production rounds.
    pub block_time: u64,
    /// Gas budget written into produced headers.
    pub block_gas_limit: u64,
    /// Transactions drained from the mempool per round.
    pub max_block_txs: usize,
    /// Reserve address receiving the pool share of gas fees.
    pub reward_pool: Address,
    /// Tier-1 (proposer) share of gas fees, percent.
    pub share_t1: u64,
    /// Tier-2 (validator) share of gas fees, percent.
    pub share_t2: u64,
    /// Tier-3 (witness) share of gas fees, percent.
    pub share_t3: u64,
    /// Reserve pool share of gas fees, percent.
    pub share_pool: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        let mut pool = [0u8; 20];
        pool[19] = 0x99;
        Self {
            chain_id: 1,
            block_time: 5,
            block_gas_limit: 30_000_000,
            max_block_txs: 100,
            reward_pool: Address(pool),
            share_t1: 60,
            share_t2: 25,
            share_t3: 5,
            share_pool: 10,
        }
    }
}

impl ChainConfig {
    /// Checks the invariants external input must satisfy.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chain_id == 0 {
            return Err(ConfigError::Invalid("chain_id must be > 0".into()));
        }
        if self.block_time == 0 {
            return Err(ConfigError::Invalid("block_time must be > 0".into()));
        }
        let sum = self.share_t1 + self.share_t2 + self.share_t3 + self.share_pool;
        if sum > 100 {
            return Err(ConfigError::Invalid(format!(
                "fee shares sum to {sum}, limit is 100"
            )));
        }
        Ok(())
    }
}

/// Node-local settings consumed by the external collaborators (ingress,
/// gossip, CLI). Enumerated here so one file describes a deployment.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Miner address as `0x`-hex; empty disables block production.
    pub miner: String,
    pub rpc_listen: String,
    pub p2p_listen: String,
    pub bootnodes: Vec<String>,
    pub data_dir: String,
    pub genesis_file: String,
    pub log_level: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            miner: String::new(),
            rpc_listen: "0.0.0.0:8545".into(),
            p2p_listen: "0.0.0.0:30303".into(),
            bootnodes: Vec::new(),
            data_dir: "./chaindata".into(),
            genesis_file: "./config/genesis.json".into(),
            log_level: "info".into(),
        }
    }
}

impl NodeConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.miner.is_empty() && Address::from_hex(&self.miner).is_none() {
            return Err(ConfigError::Invalid(format!(
                "miner address invalid: {}",
                self.miner
            )));
        }
        if self.data_dir.is_empty() {
            return Err(ConfigError::Invalid("data_dir cannot be empty".into()));
        }
        Ok(())
    }

    /// Parses the configured miner address, if any.
    pub fn miner_address(&self) -> Option<Address> {
        if self.miner.is_empty() {
            None
        } else {
            Address::from_hex(&self.miner)
        }
    }
}

/// Full node configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub chain: ChainConfig,
    pub node: NodeConfig,
}

impl Config {
    /// Loads configuration from an optional JSON file, applies environment
    /// overrides, and validates the result.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let mut cfg = match path {
            Some(p) => serde_json::from_str(&fs::read_to_string(p)?)?,
            None => Config::default(),
        };
        cfg.apply_env_overrides()?;
        cfg.chain.validate()?;
        cfg.node.validate()?;
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        override_u64("TIERCHAIN_CHAIN_ID", &mut self.chain.chain_id)?;
        override_u64("TIERCHAIN_BLOCK_TIME", &mut self.chain.block_time)?;
        override_u64("TIERCHAIN_GAS_LIMIT", &mut self.chain.block_gas_limit)?;
        override_u64("TIERCHAIN_SHARE_T1", &mut self.chain.share_t1)?;
        override_u64("TIERCHAIN_SHARE_T2", &mut self.chain.share_t2)?;
        override_u64("TIERCHAIN_SHARE_T3", &mut self.chain.share_t3)?;
        override_u64("TIERCHAIN_SHARE_POOL", &mut self.chain.share_pool)?;

        if let Ok(v) = env::var("TIERCHAIN_REWARD_POOL") {
            self.chain.reward_pool =
                Address::from_hex(&v).ok_or_else(|| ConfigError::EnvOverride {
                    key: "TIERCHAIN_REWARD_POOL".into(),
                    value: v,
                })?;
        }
        if let Ok(v) = env::var("TIERCHAIN_MINER") {
            self.node.miner = v;
        }
        if let Ok(v) = env::var("TIERCHAIN_RPC") {
            self.node.rpc_listen = v;
        }
        if let Ok(v) = env::var("TIERCHAIN_P2P") {
            self.node.p2p_listen = v;
        }
        if let Ok(v) = env::var("TIERCHAIN_DATA_DIR") {
            self.node.data_dir = v;
        }
        Ok(())
    }
}

fn override_u64(key: &str, field: &mut u64) -> Result<(), ConfigError> {
    if let Ok(v) = env::var(key) {
        *field = v.parse().map_err(|_| ConfigError::EnvOverride {
            key: key.into(),
            value: v,
        })?;
    }
    Ok(())
}
