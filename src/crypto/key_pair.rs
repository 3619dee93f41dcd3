//! ECDSA key pairs on secp256k1 with public-key recovery.
//!
//! Signatures are 65-byte `R || S || V` blobs over 32-byte digests, with
//! `V` in `{0, 1}` (the values 27/28 are accepted and normalized on
//! recovery). Addresses follow the prevalent EVM convention: the last 20
//! bytes of the Keccak-256 digest of the uncompressed public key.

use crate::types::address::{ADDRESS_LEN, Address};
use crate::types::hash::Hash;
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};
use rand_core::OsRng;
use sha3::{Digest, Keccak256};
use thiserror::Error;
use zeroize::Zeroizing;

/// Length of the `R || S || V` signature blob in bytes.
pub const SIGNATURE_LEN: usize = 65;

/// Signature and recovery failure kinds.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Input blob has the wrong length.
    #[error("invalid length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },
    /// Scalars or curve point do not decode to a valid signature.
    #[error("malformed signature point")]
    MalformedPoint,
    /// The `s` scalar is in the upper half of the curve order.
    #[error("non-canonical signature s value")]
    NonCanonicalS,
    /// No public key could be recovered for the digest and signature.
    #[error("unable to recover public key")]
    RecoveryFailed,
    /// Signing the digest failed.
    #[error("signing failed")]
    SigningFailed,
}

/// Private key for signing transactions and attestations.
///
/// Generated from OS entropy; never serialized by this crate.
#[derive(Clone)]
pub struct PrivateKey {
    key: SigningKey,
}

/// Public key with its derived account address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    key: VerifyingKey,
    address: Address,
}

impl PrivateKey {
    /// Generates a new random private key using OS-provided entropy.
    pub fn generate() -> Self {
        Self {
            key: SigningKey::random(&mut OsRng),
        }
    }

    /// Creates a private key from 32 raw bytes.
    ///
    /// Returns `None` if the bytes are not a valid secp256k1 scalar.
    pub fn from_bytes(bytes: &[u8; 32]) -> Option<Self> {
        SigningKey::from_slice(bytes).ok().map(|key| Self { key })
    }

    /// Parses a hex-encoded private key, with or without a `0x` prefix.
    ///
    /// Used for the miner-key environment variable. The intermediate byte
    /// buffer is zeroized on drop.
    pub fn from_hex(s: &str) -> Option<Self> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let bytes = Zeroizing::new(hex::decode(raw).ok()?);
        let array: &[u8; 32] = bytes.as_slice().try_into().ok()?;
        Self::from_bytes(array)
    }

    /// Derives the corresponding public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_verifying_key(*self.key.verifying_key())
    }

    /// Returns the account address controlled by this key.
    pub fn address(&self) -> Address {
        self.public_key().address()
    }

    /// Signs a 32-byte digest, producing a 65-byte `R || S || V` blob.
    ///
    /// The signature is low-S normalized and `V` is in `{0, 1}`.
    pub fn sign_digest(&self, digest: &Hash) -> Result<[u8; SIGNATURE_LEN], CryptoError> {
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(digest.as_slice())
            .map_err(|_| CryptoError::SigningFailed)?;

        let mut out = [0u8; SIGNATURE_LEN];
        out[..64].copy_from_slice(&signature.to_bytes());
        out[64] = recovery_id.to_byte();
        Ok(out)
    }
}

impl PublicKey {
    fn from_verifying_key(key: VerifyingKey) -> Self {
        let point = key.to_encoded_point(false);
        // Skip the 0x04 tag: the address covers only the 64-byte X || Y.
        let digest = Keccak256::digest(&point.as_bytes()[1..]);

        let mut addr = [0u8; ADDRESS_LEN];
        addr.copy_from_slice(&digest[32 - ADDRESS_LEN..]);

        PublicKey {
            key,
            address: Address(addr),
        }
    }

    /// Returns the derived account address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Returns the 64-byte uncompressed point (X || Y) without the tag byte.
    pub fn uncompressed_bytes(&self) -> [u8; 64] {
        let point = self.key.to_encoded_point(false);
        let mut out = [0u8; 64];
        out.copy_from_slice(&point.as_bytes()[1..]);
        out
    }
}

/// Recovers the public key that signed `digest` from a 65-byte blob.
///
/// Accepts `V` in `{0, 1}` or `{27, 28}`. Rejects malformed scalars,
/// high-S signatures, and blobs of the wrong length.
pub fn recover(digest: &Hash, signature: &[u8]) -> Result<PublicKey, CryptoError> {
    if signature.len() != SIGNATURE_LEN {
        return Err(CryptoError::InvalidLength {
            expected: SIGNATURE_LEN,
            got: signature.len(),
        });
    }

    let v = match signature[64] {
        v @ (0 | 1) => v,
        v @ (27 | 28) => v - 27,
        _ => return Err(CryptoError::RecoveryFailed),
    };
    let recovery_id = RecoveryId::from_byte(v).ok_or(CryptoError::RecoveryFailed)?;

    let parsed =
        EcdsaSignature::from_slice(&signature[..64]).map_err(|_| CryptoError::MalformedPoint)?;
    if parsed.normalize_s().is_some() {
        return Err(CryptoError::NonCanonicalS);
    }

    let key = VerifyingKey::recover_from_prehash(digest.as_slice(), &parsed, recovery_id)
        .map_err(|_| CryptoError::RecoveryFailed)?;
    Ok(PublicKey::from_verifying_key(key))
}
