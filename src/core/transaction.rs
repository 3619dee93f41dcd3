//! Signed transfer transactions with cached ids and senders.
//!
//! The sign-hash covers every field except the signature and is what the
//! private key signs; the transaction id covers the sign-hash plus the
//! signature and is the mempool's dedup key. The chain id leads the
//! sign-hash so a signature is only ever valid on one network.

use crate::core::error::ChainError;
use crate::crypto::{self, CryptoError, PrivateKey, SIGNATURE_LEN};
use crate::types::address::Address;
use crate::types::encoding::{uint_fits, write_bytes, write_u64, write_uint};
use crate::types::hash::{Hash, HashCell};
use num_bigint::BigUint;
use num_traits::Zero;
use std::sync::Mutex;

/// Specifies the operation a transaction performs.
///
/// Only native transfers exist; the discriminant is committed into the
/// sign-hash so future types cannot collide.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TxType {
    /// Native token transfer between accounts.
    Transfer = 0x01,
}

/// ECDSA signature components.
///
/// `r` and `s` are stored as unsigned integers and left-padded to 32 bytes
/// when the 65-byte recovery blob is assembled. `v` is `{0, 1}` (27/28
/// accepted on the wire and normalized during recovery).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Signature {
    pub r: BigUint,
    pub s: BigUint,
    pub v: u8,
}

/// Cached recovered sender, cleared whenever the signature changes.
#[derive(Debug, Default)]
struct SenderCell(Mutex<Option<Address>>);

impl SenderCell {
    fn get(&self) -> Option<Address> {
        *self.0.lock().unwrap()
    }

    fn set(&self, addr: Address) {
        *self.0.lock().unwrap() = Some(addr);
    }

    fn clear(&self) {
        *self.0.lock().unwrap() = None;
    }
}

impl Clone for SenderCell {
    fn clone(&self) -> Self {
        SenderCell(Mutex::new(*self.0.lock().unwrap()))
    }
}

/// A signed value transfer.
///
/// The sender is never stored on the wire; it is recovered from the
/// signature and cached. The id is cached after first computation and
/// invalidated on signature mutation.
#[derive(Clone, Debug)]
pub struct Transaction {
    pub chain_id: BigUint,
    pub tx_type: TxType,
    pub nonce: u64,
    pub to: Address,
    pub value: BigUint,
    pub gas_price: BigUint,
    pub gas_limit: u64,
    pub data: Vec<u8>,
    pub signature: Signature,

    cached_id: HashCell,
    cached_from: SenderCell,
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.chain_id == other.chain_id
            && self.tx_type == other.tx_type
            && self.nonce == other.nonce
            && self.to == other.to
            && self.value == other.value
            && self.gas_price == other.gas_price
            && self.gas_limit == other.gas_limit
            && self.data == other.data
            && self.signature == other.signature
    }
}

impl Eq for Transaction {}

impl Transaction {
    /// Creates an unsigned transfer.
    pub fn transfer(
        chain_id: u64,
        nonce: u64,
        to: Address,
        value: BigUint,
        gas_price: BigUint,
        gas_limit: u64,
        data: Vec<u8>,
    ) -> Self {
        Self {
            chain_id: BigUint::from(chain_id),
            tx_type: TxType::Transfer,
            nonce,
            to,
            value,
            gas_price,
            gas_limit,
            data,
            signature: Signature::default(),
            cached_id: HashCell::new(),
            cached_from: SenderCell::default(),
        }
    }

    /// Reassembles a transaction from wire fields, signature included.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        chain_id: BigUint,
        nonce: u64,
        to: Address,
        value: BigUint,
        gas_price: BigUint,
        gas_limit: u64,
        data: Vec<u8>,
        signature: Signature,
    ) -> Self {
        Self {
            chain_id,
            tx_type: TxType::Transfer,
            nonce,
            to,
            value,
            gas_price,
            gas_limit,
            data,
            signature,
            cached_id: HashCell::new(),
            cached_from: SenderCell::default(),
        }
    }

    /// Computes the 32-byte digest the private key signs.
    ///
    /// Covers chain id, type, nonce, recipient, value, gas price, gas
    /// limit, and the length-prefixed data; never the signature.
    pub fn hash_for_sign(&self) -> Hash {
        let mut h = Hash::sha256();
        write_uint(&mut h, &self.chain_id);
        h.update(&[self.tx_type as u8]);
        write_u64(&mut h, self.nonce);
        h.update(self.to.as_slice());
        write_uint(&mut h, &self.value);
        write_uint(&mut h, &self.gas_price);
        write_u64(&mut h, self.gas_limit);
        write_bytes(&mut h, &self.data);
        h.finalize()
    }

    /// Returns the transaction id: the sign-hash extended with the
    /// signature. Cached after first computation.
    pub fn hash(&self) -> Hash {
        self.cached_id.get_or_compute(|| {
            let mut h = Hash::sha256();
            h.update(self.hash_for_sign().as_slice());
            write_uint(&mut h, &self.signature.r);
            write_uint(&mut h, &self.signature.s);
            h.update(&[self.signature.v]);
            h.finalize()
        })
    }

    /// Performs stateless validation; consults no account state.
    pub fn validate_basic(&self) -> Result<(), ChainError> {
        if self.chain_id.is_zero() {
            return Err(ChainError::InvalidTransaction("chain id must be positive"));
        }
        if self.gas_limit == 0 {
            return Err(ChainError::InvalidTransaction("gas limit must be positive"));
        }
        // Oversized integers have no canonical encoding; reject them before
        // anything downstream tries to digest this transaction.
        if !uint_fits(&self.chain_id) || !uint_fits(&self.value) || !uint_fits(&self.gas_price) {
            return Err(ChainError::MalformedInput(
                "integer magnitude exceeds 255 bytes".into(),
            ));
        }
        Ok(())
    }

    /// Signs the transaction, writing `(r, s, v)` and caching the sender.
    ///
    /// Runs stateless validation first. The cached id is cleared because it
    /// covers the signature.
    pub fn sign(&mut self, key: &PrivateKey) -> Result<(), ChainError> {
        self.validate_basic()?;
        let digest = self.hash_for_sign();
        let blob = key.sign_digest(&digest)?;

        self.signature = Signature {
            r: BigUint::from_bytes_be(&blob[..32]),
            s: BigUint::from_bytes_be(&blob[32..64]),
            v: blob[64],
        };
        self.cached_id.clear();
        self.cached_from.set(key.address());
        Ok(())
    }

    /// Recovers the sender address from the signature, caching it.
    pub fn recover_sender(&self) -> Result<Address, ChainError> {
        if let Some(addr) = self.cached_from.get() {
            return Ok(addr);
        }
        let digest = self.hash_for_sign();
        let blob = self.signature_bytes()?;
        let public = crypto::recover(&digest, &blob)?;
        let addr = public.address();
        self.cached_from.set(addr);
        Ok(addr)
    }

    /// Returns the cached sender without attempting recovery.
    pub fn sender(&self) -> Option<Address> {
        self.cached_from.get()
    }

    /// Drops the cached sender (test hook for tamper scenarios).
    #[cfg(test)]
    pub(crate) fn forget_sender(&self) {
        self.cached_from.clear();
    }

    /// Assembles the 65-byte `R || S || V` blob, left-padding r and s.
    pub fn signature_bytes(&self) -> Result<[u8; SIGNATURE_LEN], CryptoError> {
        let mut out = [0u8; SIGNATURE_LEN];
        let r = self.signature.r.to_bytes_be();
        let s = self.signature.s.to_bytes_be();
        if r.len() > 32 || s.len() > 32 {
            return Err(CryptoError::InvalidLength {
                expected: 32,
                got: r.len().max(s.len()),
            });
        }
        out[32 - r.len()..32].copy_from_slice(&r);
        out[64 - s.len()..64].copy_from_slice(&s);
        out[64] = self.signature.v;
        Ok(out)
    }

    /// Total the sender must hold to admit this transaction:
    /// `value + gas_limit * gas_price`.
    pub fn total_cost(&self) -> BigUint {
        &self.value + self.fee()
    }

    /// Maximum gas fee: `gas_limit * gas_price`.
    pub fn fee(&self) -> BigUint {
        BigUint::from(self.gas_limit) * &self.gas_price
    }
}
