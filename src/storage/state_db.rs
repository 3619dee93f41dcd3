//! In-memory world state with snapshot/revert and a deterministic root.
//!
//! Snapshot semantics are copy-on-snapshot: taking a snapshot deep-copies
//! the current account map into a side table keyed by an opaque handle.
//! The cost is linear in state size per snapshot, acceptable at prototype
//! scale; the handle-based interface is stable, so a copy-on-write
//! implementation can replace this one without touching callers. Handles
//! are independent of each other: reverting or committing an inner handle
//! never affects an outer one.

use crate::core::account::Account;
use crate::core::error::ChainError;
use crate::types::address::Address;
use crate::types::hash::Hash;
use crate::types::merkle_tree::MerkleTree;
use num_bigint::BigUint;
use std::collections::HashMap;
use std::sync::RwLock;

/// Opaque handle addressing a captured state snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SnapshotId(u64);

struct StateInner {
    accounts: HashMap<Address, Account>,
    snapshots: HashMap<u64, HashMap<Address, Account>>,
    next_snapshot: u64,
}

/// Thread-safe account store.
///
/// All mutations serialize behind a single reader-writer lock; reads hand
/// out freshly-owned copies, never aliases into the map, so no caller can
/// observe a half-applied mutation or mutate state through a read.
pub struct StateDb {
    inner: RwLock<StateInner>,
}

impl StateDb {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StateInner {
                accounts: HashMap::new(),
                snapshots: HashMap::new(),
                next_snapshot: 0,
            }),
        }
    }

    /// Returns a copy of the account, zero-initialised if absent.
    pub fn get_account(&self, addr: Address) -> Account {
        let inner = self.inner.read().unwrap();
        inner
            .accounts
            .get(&addr)
            .cloned()
            .unwrap_or_else(|| Account::new(addr))
    }

    /// Returns the balance, zero if the account is absent.
    pub fn get_balance(&self, addr: Address) -> BigUint {
        let inner = self.inner.read().unwrap();
        inner
            .accounts
            .get(&addr)
            .map(|a| a.balance.clone())
            .unwrap_or_default()
    }

    /// Returns the nonce, zero if the account is absent.
    pub fn get_nonce(&self, addr: Address) -> u64 {
        let inner = self.inner.read().unwrap();
        inner.accounts.get(&addr).map(|a| a.nonce).unwrap_or(0)
    }

    /// Returns the recorded stake, zero if the account is absent.
    pub fn get_stake(&self, addr: Address) -> BigUint {
        let inner = self.inner.read().unwrap();
        inner
            .accounts
            .get(&addr)
            .map(|a| a.stake.clone())
            .unwrap_or_default()
    }

    /// Credits an account, creating it on first touch.
    pub fn add_balance(&self, addr: Address, amount: &BigUint) {
        let mut inner = self.inner.write().unwrap();
        inner
            .accounts
            .entry(addr)
            .or_insert_with(|| Account::new(addr))
            .add_balance(amount);
    }

    /// Debits an account, creating it on first touch; fails if the balance
    /// would go negative.
    pub fn sub_balance(&self, addr: Address, amount: &BigUint) -> Result<(), ChainError> {
        let mut inner = self.inner.write().unwrap();
        inner
            .accounts
            .entry(addr)
            .or_insert_with(|| Account::new(addr))
            .sub_balance(amount)
    }

    /// Advances an account's nonce, creating it on first touch.
    pub fn increment_nonce(&self, addr: Address) {
        let mut inner = self.inner.write().unwrap();
        inner
            .accounts
            .entry(addr)
            .or_insert_with(|| Account::new(addr))
            .increment_nonce();
    }

    /// Explicit inflation: used by genesis allocation and rewards.
    pub fn mint(&self, addr: Address, amount: &BigUint) {
        self.add_balance(addr, amount);
    }

    /// Records a stake amount on the account, creating it on first touch.
    pub fn set_stake(&self, addr: Address, stake: &BigUint) {
        let mut inner = self.inner.write().unwrap();
        inner
            .accounts
            .entry(addr)
            .or_insert_with(|| Account::new(addr))
            .stake = stake.clone();
    }

    /// Ensures an account exists, zero-initialising it if absent.
    pub fn create_account(&self, addr: Address) {
        let mut inner = self.inner.write().unwrap();
        inner
            .accounts
            .entry(addr)
            .or_insert_with(|| Account::new(addr));
    }

    /// Overwrites an account record with a deep copy of `account`.
    pub fn set_account(&self, account: &Account) {
        let mut inner = self.inner.write().unwrap();
        inner.accounts.insert(account.address, account.clone());
    }

    /// Captures a deep copy of the current account map.
    ///
    /// Snapshots nest arbitrarily; each handle is independent.
    pub fn snapshot(&self) -> SnapshotId {
        let mut inner = self.inner.write().unwrap();
        inner.next_snapshot += 1;
        let id = inner.next_snapshot;
        let copy = inner.accounts.clone();
        inner.snapshots.insert(id, copy);
        SnapshotId(id)
    }

    /// Restores the account map to the snapshot's contents and discards
    /// the handle. Unknown handles are ignored.
    pub fn revert_to_snapshot(&self, id: SnapshotId) {
        let mut inner = self.inner.write().unwrap();
        if let Some(saved) = inner.snapshots.remove(&id.0) {
            inner.accounts = saved;
        }
    }

    /// Discards the handle without restoring, keeping the work done since
    /// the snapshot. Unknown handles are ignored.
    pub fn commit_snapshot(&self, id: SnapshotId) {
        let mut inner = self.inner.write().unwrap();
        inner.snapshots.remove(&id.0);
    }

    /// Computes the deterministic state root.
    ///
    /// Leaves are `SHA-256(address || account_hash)` over addresses in
    /// lexicographic byte order, reduced by the standard Merkle tree.
    /// Empty state yields the zero hash.
    pub fn state_root(&self) -> Hash {
        let inner = self.inner.read().unwrap();
        if inner.accounts.is_empty() {
            return Hash::zero();
        }

        let mut addrs: Vec<&Address> = inner.accounts.keys().collect();
        addrs.sort();

        let leaves = addrs
            .into_iter()
            .map(|addr| {
                let account = &inner.accounts[addr];
                Hash::sha256()
                    .chain(addr.as_slice())
                    .chain(account.hash().as_slice())
                    .finalize()
            })
            .collect();
        MerkleTree::from_raw(leaves)
    }

    /// Number of accounts currently in the map.
    pub fn account_count(&self) -> usize {
        self.inner.read().unwrap().accounts.len()
    }
}

impl Default for StateDb {
    fn default() -> Self {
        Self::new()
    }
}
