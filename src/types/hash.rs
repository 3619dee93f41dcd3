//! 32-byte SHA-256 hash type with incremental hashing support.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Mutex;

/// Hash length in bytes.
pub const HASH_LEN: usize = 32;

/// Fixed-size 32-byte hash used throughout the chain.
///
/// This type is `Copy` for performance: hashes are passed frequently during
/// block validation and should live on the stack. Rendered as `0x` +
/// lowercase hex.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash(pub [u8; HASH_LEN]);

impl Hash {
    /// Creates a zero-valued hash (all bytes 0x00).
    ///
    /// Used as a sentinel for the genesis parent, empty Merkle roots, and
    /// the code/storage commitments of plain accounts.
    pub const fn zero() -> Hash {
        Hash([0u8; HASH_LEN])
    }

    /// Returns `true` if this is the zero hash.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; HASH_LEN]
    }

    /// Returns the hash as a byte slice.
    pub const fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Creates a hash from a byte slice.
    ///
    /// Returns `None` if the slice length is not exactly [`HASH_LEN`].
    pub fn from_slice(slice: &[u8]) -> Option<Hash> {
        if slice.len() != HASH_LEN {
            return None;
        }
        let mut bytes = [0u8; HASH_LEN];
        bytes.copy_from_slice(slice);
        Some(Hash(bytes))
    }

    /// Parses a `0x`-prefixed hex hash.
    pub fn from_hex(s: &str) -> Option<Hash> {
        let raw = s.strip_prefix("0x")?;
        let bytes = hex::decode(raw).ok()?;
        Hash::from_slice(&bytes)
    }

    /// Creates a new SHA-256 builder for incremental hashing.
    ///
    /// Use this when digesting multiple fields without intermediate
    /// allocations.
    pub fn sha256() -> HashBuilder {
        HashBuilder::new()
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Hash::from_hex(&s).ok_or_else(|| D::Error::custom(format!("invalid hash: {s}")))
    }
}

/// Incremental SHA-256 hash builder.
///
/// Feeds data in chunks and finalizes to produce a [`Hash`].
pub struct HashBuilder {
    hasher: Sha256,
}

impl HashBuilder {
    pub fn new() -> Self {
        Self {
            hasher: Sha256::new(),
        }
    }

    /// Feeds data into the hash computation.
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Feeds data and returns the builder for chaining.
    pub fn chain(mut self, data: &[u8]) -> Self {
        self.hasher.update(data);
        self
    }

    /// Consumes the builder and returns the final hash.
    pub fn finalize(self) -> Hash {
        Hash(self.hasher.finalize().into())
    }
}

impl Default for HashBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe lazily computed hash cell.
///
/// Caches a digest on first access and hands out the cached value until
/// [`HashCell::clear`] is called. Used for transaction ids and block ids,
/// which are pure functions of their contents but expensive to recompute.
#[derive(Debug, Default)]
pub struct HashCell {
    cached: Mutex<Option<Hash>>,
}

impl HashCell {
    /// Creates an empty cell.
    pub fn new() -> Self {
        Self {
            cached: Mutex::new(None),
        }
    }

    /// Returns the cached hash, computing it via `f` on first access.
    pub fn get_or_compute(&self, f: impl FnOnce() -> Hash) -> Hash {
        let mut guard = self.cached.lock().unwrap();
        match *guard {
            Some(hash) => hash,
            None => {
                let hash = f();
                *guard = Some(hash);
                hash
            }
        }
    }

    /// Discards the cached value.
    ///
    /// Must be called whenever a field covered by the digest is mutated.
    pub fn clear(&self) {
        *self.cached.lock().unwrap() = None;
    }
}

impl Clone for HashCell {
    fn clone(&self) -> Self {
        let cached = *self.cached.lock().unwrap();
        HashCell {
            cached: Mutex::new(cached),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_hash(seed: u8) -> Hash {
        Hash::sha256().chain(&[seed]).finalize()
    }

    #[test]
    fn zero_hash_is_all_zero_bytes() {
        assert!(Hash::zero().as_slice().iter().all(|&b| b == 0));
        assert!(Hash::zero().is_zero());
    }

    #[test]
    fn builder_matches_one_shot_digest() {
        let mut h = Hash::sha256();
        h.update(b"hello ");
        h.update(b"world");
        let incremental = h.finalize();
        let chained = Hash::sha256().chain(b"hello world").finalize();
        assert_eq!(incremental, chained);
    }

    #[test]
    fn known_sha256_vector() {
        // SHA-256("abc")
        let digest = Hash::sha256().chain(b"abc").finalize();
        assert_eq!(
            digest.to_string(),
            "0xba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn from_hex_roundtrip() {
        let hash = make_hash(7);
        assert_eq!(Hash::from_hex(&hash.to_string()), Some(hash));
        assert!(Hash::from_hex("0xdead").is_none());
        assert!(Hash::from_hex("no-prefix").is_none());
    }

    #[test]
    fn serde_json_roundtrip() {
        let hash = make_hash(9);
        let json = serde_json::to_string(&hash).expect("serialize");
        let back: Hash = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(hash, back);
    }

    #[test]
    fn cell_computes_once() {
        let cell = HashCell::new();
        let mut calls = 0;
        let first = cell.get_or_compute(|| {
            calls += 1;
            make_hash(1)
        });
        let second = cell.get_or_compute(|| {
            calls += 1;
            make_hash(2) // must not be called
        });
        assert_eq!(calls, 1);
        assert_eq!(first, second);
    }

    #[test]
    fn cell_clear_forces_recompute() {
        let cell = HashCell::new();
        let first = cell.get_or_compute(|| make_hash(1));
        cell.clear();
        let second = cell.get_or_compute(|| make_hash(2));
        assert_ne!(first, second);
    }

    #[test]
    fn cell_clone_preserves_cached_value() {
        let cell = HashCell::new();
        let hash = cell.get_or_compute(|| make_hash(42));
        let cloned = cell.clone();
        assert_eq!(cloned.get_or_compute(|| make_hash(0)), hash);
    }
}
