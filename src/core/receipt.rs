//! Transaction execution receipts.

use crate::types::hash::Hash;

/// Record of a single transaction's execution outcome within a block.
///
/// With no VM attached, `gas_used` is the transaction's full gas limit and
/// `logs` stays empty; both fields keep their slot for when execution grows
/// richer semantics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    /// Id of the transaction that produced this receipt.
    pub tx_hash: Hash,
    /// Whether the transaction executed successfully.
    pub success: bool,
    /// Gas consumed by this transaction.
    pub gas_used: u64,
    /// Opaque log entries emitted during execution.
    pub logs: Vec<Vec<u8>>,
}
