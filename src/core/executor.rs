//! Deterministic transaction executor with tiered fee routing.
//!
//! Each transaction applies atomically: a state snapshot is taken, the
//! sender is debited `value + gas_limit * gas_price`, the nonce advances,
//! the value moves, and the gas fee splits four ways (proposer,
//! validator, witness, reward pool) with integer percentages from the
//! chain config. A share whose recipient slot is the zero address is
//! burned, as is any remainder the shares leave uncovered. Any failure
//! between snapshot and commit reverts the snapshot before returning.

use crate::core::block::{Block, BlockHeader};
use crate::core::config::ChainConfig;
use crate::core::error::ChainError;
use crate::core::receipt::Receipt;
use crate::core::transaction::Transaction;
use crate::storage::state_db::StateDb;
use num_bigint::BigUint;
use num_traits::Zero;
use std::sync::{Arc, RwLock};

/// Applies transactions to the state store under a chain config.
///
/// The currently-executing block header supplies the tier recipients; it
/// must be set (via [`Executor::set_current_header`] or
/// [`Executor::execute_block`]) before any call to
/// [`Executor::execute_tx`].
pub struct Executor {
    state: Arc<StateDb>,
    config: ChainConfig,
    current_header: RwLock<BlockHeader>,
}

impl Executor {
    /// Constructs an executor bound to a state store and config.
    pub fn new(state: Arc<StateDb>, config: ChainConfig) -> Self {
        Self {
            state,
            config,
            current_header: RwLock::new(BlockHeader::default()),
        }
    }

    /// Installs the header whose tier slots fee routing pays into.
    pub fn set_current_header(&self, header: BlockHeader) {
        *self.current_header.write().unwrap() = header;
    }

    /// Returns the chain config this executor routes fees with.
    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Executes every transaction of a block in order.
    ///
    /// Installs `block.header` as the current header first. Aborts on the
    /// first failing transaction; receipts of the aborted run are dropped
    /// because every caller reverts the enclosing block snapshot. Does NOT
    /// take a block-level snapshot itself; that wrap belongs to the
    /// chain.
    pub fn execute_block(&self, block: &Block) -> Result<Vec<Receipt>, ChainError> {
        self.set_current_header(block.header.clone());

        let mut receipts = Vec::with_capacity(block.transactions.len());
        for tx in &block.transactions {
            tx.validate_basic()?;
            receipts.push(self.execute_tx(tx)?);
        }
        Ok(receipts)
    }

    /// Executes a single transaction atomically.
    pub fn execute_tx(&self, tx: &Transaction) -> Result<Receipt, ChainError> {
        let from = match tx.sender() {
            Some(addr) => addr,
            None => tx.recover_sender()?,
        };

        // Strict equality: a gap in either direction fails the tx.
        let expected = self.state.get_nonce(from);
        if tx.nonce != expected {
            return Err(ChainError::InvalidNonce {
                expected,
                got: tx.nonce,
            });
        }

        let snap = self.state.snapshot();

        if let Err(e) = self.state.sub_balance(from, &tx.total_cost()) {
            self.state.revert_to_snapshot(snap);
            return Err(e);
        }

        self.state.increment_nonce(from);

        if !tx.value.is_zero() {
            self.state.add_balance(tx.to, &tx.value);
        }

        self.distribute_fee(&tx.fee());

        self.state.commit_snapshot(snap);

        Ok(Receipt {
            tx_hash: tx.hash(),
            success: true,
            // Placeholder until a VM meters real usage.
            gas_used: tx.gas_limit,
            logs: Vec::new(),
        })
    }

    /// Splits the gas fee across the tier recipients.
    ///
    /// Integer division floors each share; a share is paid only when both
    /// it and its recipient are non-zero. The residual
    /// `fee - (t1 + t2 + t3 + pool)` stays out of circulation.
    fn distribute_fee(&self, fee: &BigUint) {
        if fee.is_zero() {
            return;
        }
        let header = self.current_header.read().unwrap();

        let t1 = fee * self.config.share_t1 / 100u32;
        let t2 = fee * self.config.share_t2 / 100u32;
        let t3 = fee * self.config.share_t3 / 100u32;
        let pool = fee * self.config.share_pool / 100u32;

        if !t1.is_zero() && !header.proposer.is_zero() {
            self.state.add_balance(header.proposer, &t1);
        }
        if !t2.is_zero() && !header.validator.is_zero() {
            self.state.add_balance(header.validator, &t2);
        }
        if !t3.is_zero() && !header.witness.is_zero() {
            self.state.add_balance(header.witness, &t3);
        }
        if !pool.is_zero() {
            self.state.add_balance(self.config.reward_pool, &pool);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::PrivateKey;
    use crate::types::address::Address;
    use crate::utils::test_utils::utils::{fund_big, key, transfer_big};
    use std::str::FromStr;

    const PROPOSER: Address = Address([0xA1; 20]);
    const VALIDATOR: Address = Address([0xA2; 20]);
    const WITNESS: Address = Address([0xA3; 20]);
    const POOL: Address = Address([0xA4; 20]);
    const RECIPIENT: Address = Address([0xB1; 20]);

    fn big(s: &str) -> BigUint {
        BigUint::from_str(s).unwrap()
    }

    fn shares_config(t1: u64, t2: u64, t3: u64, pool_share: u64) -> ChainConfig {
        ChainConfig {
            reward_pool: POOL,
            share_t1: t1,
            share_t2: t2,
            share_t3: t3,
            share_pool: pool_share,
            ..ChainConfig::default()
        }
    }

    fn header(validator: Address, witness: Address) -> BlockHeader {
        BlockHeader {
            height: 1,
            timestamp: 1_700_000_000,
            gas_limit: 30_000_000,
            proposer: PROPOSER,
            validator,
            witness,
            ..BlockHeader::default()
        }
    }

    fn executor(state: &Arc<StateDb>, config: ChainConfig, h: BlockHeader) -> Executor {
        let exec = Executor::new(Arc::clone(state), config);
        exec.set_current_header(h);
        exec
    }

    /// Signed transfer from `k`: value 10^19, gas price 10^9, gas 21000.
    fn standard_tx(k: &PrivateKey, nonce: u64) -> Transaction {
        transfer_big(
            k,
            nonce,
            RECIPIENT,
            big("10000000000000000000"),
            big("1000000000"),
            21_000,
        )
    }

    #[test]
    fn transfer_with_full_fee_distribution() {
        let state = Arc::new(StateDb::new());
        let k = key(1);
        fund_big(&state, k.address(), &big("100000000000000000000")); // 10^20

        let exec = executor(&state, shares_config(70, 20, 5, 5), header(VALIDATOR, WITNESS));
        let receipt = exec.execute_tx(&standard_tx(&k, 0)).expect("execute");

        // fee = 21000 * 10^9 = 2.1e13; shares 70/20/5/5; burn = 0
        assert_eq!(
            state.get_balance(k.address()),
            big("100000000000000000000") - big("10000000000000000000") - big("21000000000000")
        );
        assert_eq!(state.get_balance(RECIPIENT), big("10000000000000000000"));
        assert_eq!(state.get_balance(PROPOSER), big("14700000000000"));
        assert_eq!(state.get_balance(VALIDATOR), big("4200000000000"));
        assert_eq!(state.get_balance(WITNESS), big("1050000000000"));
        assert_eq!(state.get_balance(POOL), big("1050000000000"));
        assert_eq!(state.get_nonce(k.address()), 1);

        assert!(receipt.success);
        assert_eq!(receipt.gas_used, 21_000);
        assert!(receipt.logs.is_empty());
    }

    #[test]
    fn missing_validator_burns_tier2_share() {
        let state = Arc::new(StateDb::new());
        let k = key(1);
        fund_big(&state, k.address(), &big("100000000000000000000"));

        let exec = executor(
            &state,
            shares_config(70, 20, 5, 5),
            header(Address::zero(), WITNESS),
        );
        exec.execute_tx(&standard_tx(&k, 0)).expect("execute");

        // Sender pays the full fee regardless; the t2 slice goes nowhere.
        assert_eq!(
            state.get_balance(k.address()),
            big("100000000000000000000") - big("10000000000000000000") - big("21000000000000")
        );
        assert!(state.get_balance(VALIDATOR).is_zero());
        assert_eq!(state.get_balance(PROPOSER), big("14700000000000"));
        assert_eq!(state.get_balance(WITNESS), big("1050000000000"));
        assert_eq!(state.get_balance(POOL), big("1050000000000"));
    }

    #[test]
    fn insufficient_funds_reverts_everything() {
        let state = Arc::new(StateDb::new());
        let k = key(1);
        fund_big(&state, k.address(), &big("1000000")); // far too little

        let exec = executor(&state, shares_config(70, 20, 5, 5), header(VALIDATOR, WITNESS));
        let root_before = state.state_root();

        let err = exec.execute_tx(&standard_tx(&k, 0)).unwrap_err();
        assert!(matches!(err, ChainError::InsufficientFunds { .. }));

        assert_eq!(state.state_root(), root_before);
        assert_eq!(state.get_balance(k.address()), big("1000000"));
        assert_eq!(state.get_nonce(k.address()), 0);
        assert!(state.get_balance(RECIPIENT).is_zero());
        assert!(state.get_balance(PROPOSER).is_zero());
    }

    #[test]
    fn nonce_gap_fails_without_touching_state() {
        let state = Arc::new(StateDb::new());
        let k = key(1);
        fund_big(&state, k.address(), &big("100000000000000000000"));

        let exec = executor(&state, shares_config(70, 20, 5, 5), header(VALIDATOR, WITNESS));
        let root_before = state.state_root();

        let err = exec.execute_tx(&standard_tx(&k, 5)).unwrap_err();
        assert!(matches!(
            err,
            ChainError::InvalidNonce { expected: 0, got: 5 }
        ));
        assert_eq!(state.state_root(), root_before);
    }

    #[test]
    fn conservation_with_burn() {
        let state = Arc::new(StateDb::new());
        let k = key(1);
        let supply = big("100000000000000000000");
        fund_big(&state, k.address(), &supply);

        // Shares sum to 80: 20% of the fee burns.
        let exec = executor(&state, shares_config(50, 20, 5, 5), header(VALIDATOR, WITNESS));
        exec.execute_tx(&standard_tx(&k, 0)).expect("execute");

        let fee = big("21000000000000");
        let burned = &fee * 20u32 / 100u32;

        let remaining = state.get_balance(k.address())
            + state.get_balance(RECIPIENT)
            + state.get_balance(PROPOSER)
            + state.get_balance(VALIDATOR)
            + state.get_balance(WITNESS)
            + state.get_balance(POOL);
        assert_eq!(remaining, supply - burned);
    }

    #[test]
    fn zero_value_transfer_moves_only_the_fee() {
        let state = Arc::new(StateDb::new());
        let k = key(1);
        fund_big(&state, k.address(), &big("1000000000000000"));

        let exec = executor(&state, shares_config(100, 0, 0, 0), header(VALIDATOR, WITNESS));
        let tx = transfer_big(&k, 0, RECIPIENT, BigUint::zero(), big("10"), 21_000);
        exec.execute_tx(&tx).expect("execute");

        assert!(state.get_balance(RECIPIENT).is_zero());
        assert_eq!(state.get_balance(PROPOSER), big("210000"));
        assert_eq!(state.get_nonce(k.address()), 1);
    }

    #[test]
    fn free_transactions_distribute_nothing() {
        let state = Arc::new(StateDb::new());
        let k = key(1);
        fund_big(&state, k.address(), &big("100"));

        let exec = executor(&state, shares_config(70, 20, 5, 5), header(VALIDATOR, WITNESS));
        let tx = transfer_big(&k, 0, RECIPIENT, big("100"), BigUint::zero(), 21_000);
        exec.execute_tx(&tx).expect("execute");

        assert_eq!(state.get_balance(RECIPIENT), big("100"));
        assert!(state.get_balance(PROPOSER).is_zero());
        assert!(state.get_balance(POOL).is_zero());
    }

    #[test]
    fn execute_block_runs_in_order_and_aborts_on_failure() {
        let state = Arc::new(StateDb::new());
        let k = key(1);
        fund_big(&state, k.address(), &big("100000000000000000000"));

        let exec = executor(&state, shares_config(70, 20, 5, 5), header(VALIDATOR, WITNESS));

        let good = Block::new(header(VALIDATOR, WITNESS), vec![
            standard_tx(&k, 0),
            standard_tx(&k, 1),
        ]);
        let receipts = exec.execute_block(&good).expect("block");
        assert_eq!(receipts.len(), 2);
        assert_eq!(state.get_nonce(k.address()), 2);

        // Nonce 5 cannot follow nonce 2: the block aborts.
        let bad = Block::new(header(VALIDATOR, WITNESS), vec![standard_tx(&k, 5)]);
        assert!(matches!(
            exec.execute_block(&bad).unwrap_err(),
            ChainError::InvalidNonce { .. }
        ));
        // The failed tx itself left no trace.
        assert_eq!(state.get_nonce(k.address()), 2);
    }

    #[test]
    fn failed_tx_inside_block_reverts_only_itself() {
        let state = Arc::new(StateDb::new());
        let k = key(1);
        fund_big(&state, k.address(), &big("100000000000000000000"));

        let exec = executor(&state, shares_config(70, 20, 5, 5), header(VALIDATOR, WITNESS));
        exec.execute_tx(&standard_tx(&k, 0)).expect("first");
        let balance_after_first = state.get_balance(k.address());

        // Out-of-order nonce fails before any snapshot is taken.
        assert!(exec.execute_tx(&standard_tx(&k, 3)).is_err());
        assert_eq!(state.get_balance(k.address()), balance_after_first);

        // The account can continue at its real nonce.
        exec.execute_tx(&standard_tx(&k, 1)).expect("second");
    }
}
