//! Block and header structures with canonical header hashing.

use crate::core::error::ChainError;
use crate::core::transaction::Transaction;
use crate::types::address::Address;
use crate::types::encoding::{write_bytes, write_u64};
use crate::types::hash::{Hash, HashCell};
use crate::types::merkle_tree::MerkleTree;

/// Maximum size of the header's free-form `extra` field.
pub const MAX_EXTRA_BYTES: usize = 1024;

/// Block header: metadata, cryptographic commitments, and the tier slots
/// that fee routing pays into.
///
/// `validator` and `witness` may be zero when no attestation was selected
/// for the round; `proposer` must be non-zero on every block after genesis.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockHeader {
    /// Hash of the parent block, forming the chain.
    pub parent_hash: Hash,
    /// World-state root after executing this block.
    pub state_root: Hash,
    /// Merkle root over the transaction ids in the body.
    pub tx_root: Hash,
    /// Merkle root over receipts (reserved; zero until receipts are committed).
    pub receipts_root: Hash,
    /// Block index in the chain (genesis = 0).
    pub height: u64,
    /// Unix timestamp in seconds; positive on non-genesis blocks.
    pub timestamp: i64,
    /// Gas consumed by the block's transactions.
    pub gas_used: u64,
    /// Gas budget for the block.
    pub gas_limit: u64,
    /// Tier-1 block producer.
    pub proposer: Address,
    /// Tier-2 attestor selected from the vote bucket, or zero.
    pub validator: Address,
    /// Tier-3 attestor drawn from the witness queue, or zero.
    pub witness: Address,
    /// Free-form bytes, at most [`MAX_EXTRA_BYTES`].
    pub extra: Vec<u8>,
}

impl BlockHeader {
    /// Computes the canonical header hash (the block id).
    ///
    /// Fixed field order; every field participates, so any header mutation
    /// yields a different id.
    pub fn hash(&self) -> Hash {
        let mut h = Hash::sha256();
        h.update(self.parent_hash.as_slice());
        h.update(self.state_root.as_slice());
        h.update(self.tx_root.as_slice());
        h.update(self.receipts_root.as_slice());
        write_u64(&mut h, self.height);
        write_u64(&mut h, self.timestamp as u64);
        write_u64(&mut h, self.gas_used);
        write_u64(&mut h, self.gas_limit);
        h.update(self.proposer.as_slice());
        h.update(self.validator.as_slice());
        h.update(self.witness.as_slice());
        write_bytes(&mut h, &self.extra);
        h.finalize()
    }
}

/// Immutable block: header plus ordered transactions.
///
/// The header hash is computed lazily and cached.
#[derive(Clone, Debug)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,

    cached_hash: HashCell,
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.header == other.header && self.transactions == other.transactions
    }
}

impl Eq for Block {}

impl Block {
    /// Constructs a block, binding the header's transaction root to the
    /// body.
    pub fn new(mut header: BlockHeader, transactions: Vec<Transaction>) -> Self {
        header.tx_root = MerkleTree::from_transactions(&transactions);
        Self {
            header,
            transactions,
            cached_hash: HashCell::new(),
        }
    }

    /// Returns the block id (canonical header hash), cached after first
    /// computation.
    pub fn hash(&self) -> Hash {
        self.cached_hash.get_or_compute(|| self.header.hash())
    }

    /// Performs stateless validation of header and body.
    ///
    /// Checks gas bounds, timestamp sanity, the non-genesis proposer rule,
    /// the `extra` size cap, the transaction-root commitment, and every
    /// transaction's own stateless validation. Consults no chain state.
    pub fn validate_basic(&self) -> Result<(), ChainError> {
        let h = &self.header;

        if h.gas_limit == 0 {
            return Err(ChainError::InvalidBlock("gas limit must be > 0".into()));
        }
        if h.gas_used > h.gas_limit {
            return Err(ChainError::InvalidBlock(format!(
                "gas used {} exceeds gas limit {}",
                h.gas_used, h.gas_limit
            )));
        }
        if h.timestamp < 0 {
            return Err(ChainError::InvalidBlock("negative timestamp".into()));
        }
        if h.height > 0 && h.timestamp == 0 {
            return Err(ChainError::InvalidBlock(
                "non-genesis block requires a timestamp".into(),
            ));
        }
        if h.height > 0 && h.proposer.is_zero() {
            return Err(ChainError::InvalidBlock(
                "non-genesis block requires a proposer".into(),
            ));
        }
        if h.extra.len() > MAX_EXTRA_BYTES {
            return Err(ChainError::InvalidBlock(format!(
                "extra field is {} bytes, limit is {MAX_EXTRA_BYTES}",
                h.extra.len()
            )));
        }

        let computed = MerkleTree::from_transactions(&self.transactions);
        if computed != h.tx_root {
            return Err(ChainError::InvalidBlock("tx root mismatch".into()));
        }

        for tx in &self.transactions {
            tx.validate_basic()?;
        }
        Ok(())
    }
}
