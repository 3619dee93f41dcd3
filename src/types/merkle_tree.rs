//! Merkle tree helpers producing deterministic roots over 32-byte nodes.
//!
//! Behavior:
//! - an empty list of leaves yields the all-zero hash
//! - a single leaf is its own root (no doubling at the leaf level)
//! - a level with an odd node count duplicates its last node
//! - parents are `SHA-256(left || right)`
//!
//! The reduction is performed in place to minimize allocations. The same
//! routine backs both the transaction root and the state root.

use crate::core::transaction::Transaction;
use crate::types::hash::Hash;

/// Utility functions to build Merkle roots from hashes or transactions.
pub struct MerkleTree;

impl MerkleTree {
    fn hash_pair(left: Hash, right: Hash) -> Hash {
        Hash::sha256()
            .chain(left.as_slice())
            .chain(right.as_slice())
            .finalize()
    }

    /// Computes a Merkle root from the provided leaf hashes.
    ///
    /// Returns the zero hash when `nodes` is empty.
    pub fn from_raw(mut nodes: Vec<Hash>) -> Hash {
        if nodes.is_empty() {
            return Hash::zero();
        }

        let mut len = nodes.len();
        while len > 1 {
            let mut write = 0;
            let mut read = 0;
            while read < len {
                let left = nodes[read];
                let right = if read + 1 < len {
                    nodes[read + 1]
                } else {
                    left
                };
                nodes[write] = Self::hash_pair(left, right);
                write += 1;
                read += 2;
            }
            len = write;
        }

        nodes[0]
    }

    /// Computes the transaction root from transaction ids.
    ///
    /// Returns the zero hash when `txs` is empty.
    pub fn from_transactions(txs: &[Transaction]) -> Hash {
        if txs.is_empty() {
            return Hash::zero();
        }
        Self::from_raw(txs.iter().map(|tx| tx.hash()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::utils::{key, signed_transfer};

    fn hash_leaf(data: &[u8]) -> Hash {
        Hash::sha256().chain(data).finalize()
    }

    #[test]
    fn empty_returns_zero_hash() {
        assert_eq!(MerkleTree::from_raw(Vec::new()), Hash::zero());
        assert_eq!(MerkleTree::from_transactions(&[]), Hash::zero());
    }

    #[test]
    fn single_leaf_is_its_own_root() {
        let leaf = hash_leaf(b"leaf");
        assert_eq!(MerkleTree::from_raw(vec![leaf]), leaf);
    }

    #[test]
    fn even_count_matches_manual_reduction() {
        let a = hash_leaf(b"a");
        let b = hash_leaf(b"b");
        let c = hash_leaf(b"c");
        let d = hash_leaf(b"d");

        let left = MerkleTree::hash_pair(a, b);
        let right = MerkleTree::hash_pair(c, d);
        let expected = MerkleTree::hash_pair(left, right);

        assert_eq!(MerkleTree::from_raw(vec![a, b, c, d]), expected);
    }

    #[test]
    fn odd_count_duplicates_last_node() {
        let a = hash_leaf(b"a");
        let b = hash_leaf(b"b");
        let c = hash_leaf(b"c");

        let left = MerkleTree::hash_pair(a, b);
        let right = MerkleTree::hash_pair(c, c);
        let expected = MerkleTree::hash_pair(left, right);

        assert_eq!(MerkleTree::from_raw(vec![a, b, c]), expected);
    }

    #[test]
    fn five_leaves_duplicate_at_two_levels() {
        let leaves: Vec<Hash> = (0u8..5).map(|i| hash_leaf(&[i])).collect();

        let l0 = MerkleTree::hash_pair(leaves[0], leaves[1]);
        let l1 = MerkleTree::hash_pair(leaves[2], leaves[3]);
        let l2 = MerkleTree::hash_pair(leaves[4], leaves[4]);
        let m0 = MerkleTree::hash_pair(l0, l1);
        let m1 = MerkleTree::hash_pair(l2, l2);
        let expected = MerkleTree::hash_pair(m0, m1);

        assert_eq!(MerkleTree::from_raw(leaves), expected);
    }

    #[test]
    fn single_transaction_root_is_its_id() {
        let tx = signed_transfer(&key(1), 0, 1);
        let root = MerkleTree::from_transactions(std::slice::from_ref(&tx));
        assert_eq!(root, tx.hash());
    }

    #[test]
    fn transaction_root_matches_explicit_ids() {
        let txs = vec![
            signed_transfer(&key(1), 0, 1),
            signed_transfer(&key(2), 0, 2),
            signed_transfer(&key(3), 0, 3),
        ];
        let ids: Vec<Hash> = txs.iter().map(|tx| tx.hash()).collect();
        assert_eq!(MerkleTree::from_transactions(&txs), MerkleTree::from_raw(ids));
    }
}
