//! Account state and its canonical hash.

use crate::core::error::ChainError;
use crate::types::address::Address;
use crate::types::encoding::{write_u64, write_uint};
use crate::types::hash::Hash;
use num_bigint::BigUint;
use num_traits::Zero;

/// World-state record for a single address.
///
/// Balances and stakes are non-negative arbitrary-precision integers. The
/// code hash and storage root exist for forward compatibility with a
/// contract VM and stay zero on every path in this crate; `frozen` is a
/// penalty flag with no effect on execution yet. Stake is recorded by
/// genesis and deliberately excluded from [`Account::hash`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub address: Address,
    pub balance: BigUint,
    pub nonce: u64,
    pub code_hash: Hash,
    pub storage_root: Hash,
    pub frozen: bool,
    pub stake: BigUint,
}

impl Account {
    /// Creates a zero-initialised account for the given address.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            balance: BigUint::zero(),
            nonce: 0,
            code_hash: Hash::zero(),
            storage_root: Hash::zero(),
            frozen: false,
            stake: BigUint::zero(),
        }
    }

    /// Computes the canonical account hash committed into the state root.
    ///
    /// Covers address, balance, nonce, code hash, storage root, and the
    /// frozen flag, in that order.
    pub fn hash(&self) -> Hash {
        let mut h = Hash::sha256();
        h.update(self.address.as_slice());
        write_uint(&mut h, &self.balance);
        write_u64(&mut h, self.nonce);
        h.update(self.code_hash.as_slice());
        h.update(self.storage_root.as_slice());
        h.update(&[self.frozen as u8]);
        h.finalize()
    }

    /// Credits the balance.
    pub fn add_balance(&mut self, amount: &BigUint) {
        self.balance += amount;
    }

    /// Debits the balance, failing if it would go negative.
    pub fn sub_balance(&mut self, amount: &BigUint) -> Result<(), ChainError> {
        if self.balance < *amount {
            return Err(ChainError::InsufficientFunds {
                address: self.address,
            });
        }
        self.balance -= amount;
        Ok(())
    }

    /// Advances the nonce by one.
    pub fn increment_nonce(&mut self) {
        self.nonce += 1;
    }
}
