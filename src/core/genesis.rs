//! Genesis file loading and initial state allocation.
//!
//! The genesis file carries the chain id, premined balances, and the
//! initial validator set with stakes. Allocations are minted into
//! balances; validator stakes are recorded on the accounts (informational
//! for now; no consensus consumes them here).

use crate::core::config::{ChainConfig, ConfigError};
use crate::storage::state_db::StateDb;
use crate::types::address::Address;
use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// A premined balance entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisAccount {
    pub address: Address,
    /// Decimal string; arbitrary precision.
    pub balance: String,
}

/// An initial validator entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisValidator {
    pub address: Address,
    /// Decimal string; must be positive.
    pub stake: String,
}

/// Parsed genesis file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Genesis {
    pub chain_id: u64,
    #[serde(default)]
    pub alloc: Vec<GenesisAccount>,
    #[serde(default)]
    pub validators: Vec<GenesisValidator>,
}

impl Genesis {
    /// Reads and parses a genesis file.
    pub fn load(path: &Path) -> Result<Genesis, ConfigError> {
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }

    /// Boots the initial world state from this genesis.
    ///
    /// Mints every allocation, ensures the reward pool account exists,
    /// creates validator accounts with their stakes, and returns the
    /// validator address list. Runs before the chain starts serving; the
    /// caller produces the height-0 block afterwards.
    pub fn apply(&self, state: &StateDb, config: &ChainConfig) -> Result<Vec<Address>, ConfigError> {
        if self.chain_id != 0 && self.chain_id != config.chain_id {
            return Err(ConfigError::Invalid(format!(
                "genesis chain_id {} does not match configured chain_id {}",
                self.chain_id, config.chain_id
            )));
        }

        for entry in &self.alloc {
            let amount = parse_decimal(&entry.balance).ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "non-numeric genesis balance for {}: {}",
                    entry.address, entry.balance
                ))
            })?;
            state.mint(entry.address, &amount);
        }

        state.create_account(config.reward_pool);

        let mut validators = Vec::with_capacity(self.validators.len());
        for entry in &self.validators {
            let stake = parse_decimal(&entry.stake)
                .filter(|s| !s.is_zero())
                .ok_or_else(|| {
                    ConfigError::Invalid(format!(
                        "invalid stake for validator {}: {}",
                        entry.address, entry.stake
                    ))
                })?;
            state.create_account(entry.address);
            state.set_stake(entry.address, &stake);
            validators.push(entry.address);
        }

        Ok(validators)
    }
}

fn parse_decimal(s: &str) -> Option<BigUint> {
    BigUint::from_str(s).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn addr(n: u8) -> Address {
        Address([n; 20])
    }

    fn genesis() -> Genesis {
        Genesis {
            chain_id: 1,
            alloc: vec![GenesisAccount {
                address: addr(1),
                balance: "100000000000000000000".into(),
            }],
            validators: vec![GenesisValidator {
                address: addr(2),
                stake: "1000000000000000000000".into(),
            }],
        }
    }

    #[test]
    fn apply_mints_allocations_and_records_stakes() {
        let state = StateDb::new();
        let config = ChainConfig::default();

        let validators = genesis().apply(&state, &config).expect("apply");

        assert_eq!(
            state.get_balance(addr(1)),
            BigUint::from_str("100000000000000000000").unwrap()
        );
        assert_eq!(validators, vec![addr(2)]);
        assert_eq!(
            state.get_stake(addr(2)),
            BigUint::from_str("1000000000000000000000").unwrap()
        );
        // Validator balance stays zero; stake is a parallel field.
        assert!(state.get_balance(addr(2)).is_zero());
    }

    #[test]
    fn apply_rejects_chain_id_mismatch() {
        let state = StateDb::new();
        let config = ChainConfig::default();
        let mut g = genesis();
        g.chain_id = 99;
        assert!(matches!(
            g.apply(&state, &config),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn apply_accepts_unset_chain_id() {
        let state = StateDb::new();
        let config = ChainConfig::default();
        let mut g = genesis();
        g.chain_id = 0;
        assert!(g.apply(&state, &config).is_ok());
    }

    #[test]
    fn apply_rejects_bad_balance_and_zero_stake() {
        let state = StateDb::new();
        let config = ChainConfig::default();

        let mut g = genesis();
        g.alloc[0].balance = "12x".into();
        assert!(g.apply(&state, &config).is_err());

        let mut g = genesis();
        g.validators[0].stake = "0".into();
        assert!(g.apply(&state, &config).is_err());
    }

    #[test]
    fn load_parses_wire_format() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(
            file,
            r#"{{"chain_id": 7,
                "alloc": [{{"address": "0x0101010101010101010101010101010101010101",
                            "balance": "1000"}}],
                "validators": [{{"address": "0x0202020202020202020202020202020202020202",
                                 "stake": "50"}}]}}"#
        )
        .expect("write");

        let g = Genesis::load(file.path()).expect("load");
        assert_eq!(g.chain_id, 7);
        assert_eq!(g.alloc.len(), 1);
        assert_eq!(g.alloc[0].address, addr(1));
        assert_eq!(g.validators[0].stake, "50");
    }

    #[test]
    fn genesis_state_contributes_to_root() {
        let state = StateDb::new();
        let config = ChainConfig::default();
        let empty_root = state.state_root();

        genesis().apply(&state, &config).expect("apply");
        assert_ne!(state.state_root(), empty_root);
    }
}
