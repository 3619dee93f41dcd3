//! Fee-priority pool of pending transactions.
//!
//! Admission checks run in a fixed order: stateless validation, dedup by
//! transaction id, signature recovery, funds, nonce. Nonces strictly below
//! the account nonce are rejected; higher-than-next nonces are admitted
//! (the producer orders drained transactions per sender, and the executor
//! fails any that still arrive out of order). When the pool is full the
//! single cheapest pending transaction is evicted, earliest-admitted first
//! on ties.

use crate::core::error::ChainError;
use crate::core::transaction::Transaction;
use crate::storage::state_db::StateDb;
use crate::types::hash::Hash;
use std::collections::HashSet;
use std::sync::{Arc, RwLock};

/// Default pool capacity.
pub const MEMPOOL_CAPACITY: usize = 5000;

struct PoolInner {
    pending: Vec<Transaction>,
    seen: HashSet<Hash>,
}

/// Thread-safe pending-transaction pool.
///
/// One exclusive lock serializes every mutation; admission and draining
/// never interleave. Funds and nonce checks read the state store through
/// its own lock.
pub struct Mempool {
    state: Arc<StateDb>,
    capacity: usize,
    inner: RwLock<PoolInner>,
}

impl Mempool {
    /// Creates a pool bound to a read-only view of the state.
    ///
    /// Uses [`MEMPOOL_CAPACITY`] if `capacity` is `None`.
    pub fn new(state: Arc<StateDb>, capacity: Option<usize>) -> Self {
        Self {
            state,
            capacity: capacity.unwrap_or(MEMPOOL_CAPACITY).max(1),
            inner: RwLock::new(PoolInner {
                pending: Vec::new(),
                seen: HashSet::new(),
            }),
        }
    }

    /// Admits a transaction, returning its id.
    ///
    /// Rejections: stateless validation failure, duplicate id, signature
    /// recovery failure, balance below `value + gas_limit * gas_price`,
    /// nonce below the account nonce. A full pool evicts its cheapest
    /// transaction instead of rejecting the newcomer.
    pub fn add_tx(&self, tx: Transaction) -> Result<Hash, ChainError> {
        tx.validate_basic()?;

        let hash = tx.hash();
        let mut inner = self.inner.write().unwrap();

        if inner.seen.contains(&hash) {
            return Err(ChainError::Duplicate(hash));
        }

        let from = tx.recover_sender()?;

        if self.state.get_balance(from) < tx.total_cost() {
            return Err(ChainError::InsufficientFunds { address: from });
        }

        let current_nonce = self.state.get_nonce(from);
        if tx.nonce < current_nonce {
            return Err(ChainError::InvalidNonce {
                expected: current_nonce,
                got: tx.nonce,
            });
        }

        if inner.pending.len() >= self.capacity {
            Self::evict_cheapest(&mut inner);
        }

        inner.seen.insert(hash);
        inner.pending.push(tx);
        Ok(hash)
    }

    /// Drops the pending transaction with the lowest gas price.
    ///
    /// The scan keeps the first minimum it sees, so ties evict the
    /// earliest-admitted transaction.
    fn evict_cheapest(inner: &mut PoolInner) {
        let Some(mut cheapest) = inner.pending.first().map(|tx| (0, tx.gas_price.clone())) else {
            return;
        };
        for (i, tx) in inner.pending.iter().enumerate().skip(1) {
            if tx.gas_price < cheapest.1 {
                cheapest = (i, tx.gas_price.clone());
            }
        }
        let evicted = inner.pending.remove(cheapest.0);
        inner.seen.remove(&evicted.hash());
    }

    /// Removes and returns up to `n` transactions in non-increasing
    /// gas-price order.
    ///
    /// The sort is stable: equal gas prices drain in admission order.
    pub fn pop_for_block(&self, n: usize) -> Vec<Transaction> {
        let mut inner = self.inner.write().unwrap();
        if inner.pending.is_empty() || n == 0 {
            return Vec::new();
        }

        inner
            .pending
            .sort_by(|a, b| b.gas_price.cmp(&a.gas_price));

        let take = n.min(inner.pending.len());
        let drained: Vec<Transaction> = inner.pending.drain(..take).collect();
        for tx in &drained {
            inner.seen.remove(&tx.hash());
        }
        drained
    }

    /// Returns the number of pending transactions.
    pub fn count(&self) -> usize {
        self.inner.read().unwrap().pending.len()
    }

    /// Returns `true` if a transaction with this id is pending.
    pub fn contains(&self, hash: Hash) -> bool {
        self.inner.read().unwrap().seen.contains(&hash)
    }
}
