//! Tier-3 witness attestations.
//!
//! A witness signs the header hash it observed. Witnesses have no effect
//! on execution; the producer queues them FIFO and pays the tier-3 fee
//! share to the next one drawn when sealing a block.

use crate::core::error::ChainError;
use crate::crypto::{self, PrivateKey};
use crate::types::address::Address;
use crate::types::hash::Hash;

/// A mobile witness's signed observation of a block header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Witness {
    /// Height being witnessed.
    pub height: u64,
    /// Witness account address.
    pub address: Address,
    /// Header hash that was signed.
    pub hash: Hash,
    /// 65-byte `R || S || V` blob over `hash`.
    pub signature: Vec<u8>,
}

impl Witness {
    /// Creates and signs a witness attestation over a header hash.
    pub fn sign(key: &PrivateKey, height: u64, hash: Hash) -> Result<Witness, ChainError> {
        let signature = key.sign_digest(&hash)?;
        Ok(Witness {
            height,
            address: key.address(),
            hash,
            signature: signature.to_vec(),
        })
    }

    /// Verifies that the signature over the header hash recovers the
    /// claimed witness address.
    pub fn verify(&self) -> Result<(), ChainError> {
        let recovered = crypto::recover(&self.hash, &self.signature)?.address();
        if recovered != self.address {
            return Err(ChainError::InvalidSignature(
                "recovered signer does not match witness".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::utils::key;

    fn header_hash() -> Hash {
        Hash::sha256().chain(b"header").finalize()
    }

    #[test]
    fn sign_then_verify_roundtrip() {
        let k = key(1);
        let witness = Witness::sign(&k, 5, header_hash()).expect("sign");
        assert_eq!(witness.address, k.address());
        assert!(witness.verify().is_ok());
    }

    #[test]
    fn verify_rejects_wrong_address() {
        let mut witness = Witness::sign(&key(1), 5, header_hash()).expect("sign");
        witness.address = key(2).address();
        assert!(matches!(
            witness.verify().unwrap_err(),
            ChainError::InvalidSignature(_)
        ));
    }

    #[test]
    fn verify_rejects_different_hash() {
        let mut witness = Witness::sign(&key(1), 5, header_hash()).expect("sign");
        witness.hash = Hash::sha256().chain(b"forged").finalize();
        assert!(witness.verify().is_err());
    }

    #[test]
    fn verify_rejects_malformed_signature() {
        let mut witness = Witness::sign(&key(1), 5, header_hash()).expect("sign");
        witness.signature = vec![0u8; 10];
        assert!(witness.verify().is_err());
    }
}
