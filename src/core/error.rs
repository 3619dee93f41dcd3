//! Error taxonomy for the execution core.
//!
//! Every failure is a returned value; no component panics across its
//! boundary. The variants are stable tags that callers (and tests) match
//! on. Pool-full is handled by eviction and never surfaced.

use crate::crypto::CryptoError;
use crate::types::address::Address;
use crate::types::hash::Hash;
use thiserror::Error;

/// Errors surfaced by the state store, mempool, executor, and chain.
#[derive(Debug, Error)]
pub enum ChainError {
    /// Bad hex, wrong length, or an unparseable integer in external input.
    #[error("malformed input: {0}")]
    MalformedInput(String),
    /// Signature recovery failed or the recovered signer is not the
    /// expected address.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
    /// Transaction nonce does not line up with the sender's account nonce.
    #[error("invalid nonce: account at {expected}, transaction has {got}")]
    InvalidNonce { expected: u64, got: u64 },
    /// A debit would drive the account balance negative.
    #[error("insufficient funds in account {address}")]
    InsufficientFunds { address: Address },
    /// Stateless transaction validation failed.
    #[error("invalid transaction: {0}")]
    InvalidTransaction(&'static str),
    /// Stateless block validation failed.
    #[error("invalid block: {0}")]
    InvalidBlock(String),
    /// The block's parent hash is not in the chain index.
    #[error("unknown parent block {0}")]
    UnknownParent(Hash),
    /// The block height does not extend its parent by exactly one.
    #[error("invalid height: expected {expected}, got {got}")]
    InvalidHeight { expected: u64, got: u64 },
    /// A genesis block was submitted to a chain that already has one.
    #[error("genesis block already exists")]
    GenesisAlreadyExists,
    /// Re-execution produced a state root different from the header's.
    #[error("state root mismatch: header has {header}, computed {computed}")]
    StateRootMismatch { header: Hash, computed: Hash },
    /// The transaction is already pending in the mempool.
    #[error("duplicate transaction {0}")]
    Duplicate(Hash),
}

impl From<CryptoError> for ChainError {
    fn from(err: CryptoError) -> Self {
        ChainError::InvalidSignature(err.to_string())
    }
}
