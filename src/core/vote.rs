//! Tier-2 validator attestations.
//!
//! A vote binds (chain id, height, block hash, voter) under a secp256k1
//! signature. Votes are informational: they never gate commitment, but the
//! producer uses the first stored vote for the parent height to fill the
//! next header's validator slot, which earns the voter the tier-2 fee
//! share.

use crate::core::error::ChainError;
use crate::crypto::{self, PrivateKey};
use crate::types::address::Address;
use crate::types::encoding::write_u64;
use crate::types::hash::Hash;

/// A validator's signed attestation for a block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatorVote {
    pub chain_id: u64,
    pub height: u64,
    pub block_hash: Hash,
    pub voter: Address,
    /// 65-byte `R || S || V` blob.
    pub signature: Vec<u8>,
}

impl ValidatorVote {
    /// Computes the canonical digest the validator signs:
    /// `SHA-256(u64BE(chainId) || u64BE(height) || blockHash || voter)`.
    pub fn signing_digest(
        chain_id: u64,
        height: u64,
        block_hash: Hash,
        voter: Address,
    ) -> Hash {
        let mut h = Hash::sha256();
        write_u64(&mut h, chain_id);
        write_u64(&mut h, height);
        h.update(block_hash.as_slice());
        h.update(voter.as_slice());
        h.finalize()
    }

    /// Creates and signs a vote for the given block.
    pub fn sign(
        key: &PrivateKey,
        chain_id: u64,
        height: u64,
        block_hash: Hash,
    ) -> Result<ValidatorVote, ChainError> {
        let voter = key.address();
        let digest = Self::signing_digest(chain_id, height, block_hash, voter);
        let signature = key.sign_digest(&digest)?;
        Ok(ValidatorVote {
            chain_id,
            height,
            block_hash,
            voter,
            signature: signature.to_vec(),
        })
    }

    /// Verifies the signature and returns the recovered voter address.
    ///
    /// Fails if recovery fails or the recovered address is not the claimed
    /// voter.
    pub fn verify(&self) -> Result<Address, ChainError> {
        let digest =
            Self::signing_digest(self.chain_id, self.height, self.block_hash, self.voter);
        let recovered = crypto::recover(&digest, &self.signature)?.address();
        if recovered != self.voter {
            return Err(ChainError::InvalidSignature(
                "recovered signer does not match voter".into(),
            ));
        }
        Ok(recovered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::utils::key;

    fn block_hash() -> Hash {
        Hash::sha256().chain(b"block").finalize()
    }

    #[test]
    fn sign_then_verify_roundtrip() {
        let k = key(1);
        let vote = ValidatorVote::sign(&k, 1, 10, block_hash()).expect("sign");
        assert_eq!(vote.voter, k.address());
        assert_eq!(vote.verify().expect("verify"), k.address());
    }

    #[test]
    fn verify_rejects_claimed_voter_mismatch() {
        let k = key(1);
        let mut vote = ValidatorVote::sign(&k, 1, 10, block_hash()).expect("sign");
        vote.voter = key(2).address();
        assert!(matches!(
            vote.verify().unwrap_err(),
            ChainError::InvalidSignature(_)
        ));
    }

    #[test]
    fn verify_rejects_tampered_fields() {
        let k = key(1);
        let signed = ValidatorVote::sign(&k, 1, 10, block_hash()).expect("sign");

        let mut height = signed.clone();
        height.height = 11;
        assert!(height.verify().is_err());

        let mut chain = signed.clone();
        chain.chain_id = 2;
        assert!(chain.verify().is_err());

        let mut hash = signed.clone();
        hash.block_hash = Hash::sha256().chain(b"other").finalize();
        assert!(hash.verify().is_err());
    }

    #[test]
    fn verify_rejects_truncated_signature() {
        let k = key(1);
        let mut vote = ValidatorVote::sign(&k, 1, 10, block_hash()).expect("sign");
        vote.signature.truncate(64);
        assert!(matches!(
            vote.verify().unwrap_err(),
            ChainError::InvalidSignature(_)
        ));
    }

    #[test]
    fn digest_covers_every_field() {
        let base = ValidatorVote::signing_digest(1, 10, block_hash(), key(1).address());
        assert_ne!(
            base,
            ValidatorVote::signing_digest(2, 10, block_hash(), key(1).address())
        );
        assert_ne!(
            base,
            ValidatorVote::signing_digest(1, 11, block_hash(), key(1).address())
        );
        assert_ne!(
            base,
            ValidatorVote::signing_digest(1, 10, Hash::zero(), key(1).address())
        );
        assert_ne!(
            base,
            ValidatorVote::signing_digest(1, 10, block_hash(), key(2).address())
        );
    }
}
