//! Canonical field encoders feeding the chain's digests.
//!
//! Every hash in the system (sign-hashes, tx ids, account hashes, header
//! ids, vote digests) is built from the same three encodings:
//!
//! - unsigned big integers: one length byte `L` in `[0, 255]` followed by
//!   `L` big-endian magnitude bytes; zero encodes as the single byte `0x00`
//! - `u64` fields: 8 bytes, big-endian
//! - variable-length byte fields: 8-byte big-endian length prefix followed
//!   by the raw bytes

use crate::types::hash::HashBuilder;
use num_bigint::BigUint;
use num_traits::Zero;

/// Maximum magnitude, in bytes, a canonically encoded integer may have.
///
/// The single length byte caps magnitudes at 255 bytes (~2040 bits), far
/// beyond any realistic chain id, balance, value, or gas price.
pub const MAX_INT_MAGNITUDE: usize = 255;

/// Returns `true` if `n` fits the canonical single-length-byte encoding.
///
/// Stateless validation rejects integers that fail this check before any
/// digest is computed, so [`write_uint`] never aborts on validated input.
pub fn uint_fits(n: &BigUint) -> bool {
    n.is_zero() || n.to_bytes_be().len() <= MAX_INT_MAGNITUDE
}

/// Writes the canonical encoding of an unsigned big integer.
///
/// # Panics
/// Aborts with a descriptive panic if the magnitude exceeds
/// [`MAX_INT_MAGNITUDE`] bytes. Silent truncation here would let two
/// distinct integers share an encoding, corrupting every digest built on
/// top; callers gate untrusted input through [`uint_fits`] first.
pub fn write_uint(h: &mut HashBuilder, n: &BigUint) {
    if n.is_zero() {
        h.update(&[0u8]);
        return;
    }
    let magnitude = n.to_bytes_be();
    if magnitude.len() > MAX_INT_MAGNITUDE {
        panic!(
            "canonical integer encoding overflow: magnitude is {} bytes, limit is {}",
            magnitude.len(),
            MAX_INT_MAGNITUDE
        );
    }
    h.update(&[magnitude.len() as u8]);
    h.update(&magnitude);
}

/// Writes a `u64` as 8 big-endian bytes.
pub fn write_u64(h: &mut HashBuilder, v: u64) {
    h.update(&v.to_be_bytes());
}

/// Writes a variable-length byte field: 8-byte big-endian length, then the
/// raw bytes.
pub fn write_bytes(h: &mut HashBuilder, bytes: &[u8]) {
    write_u64(h, bytes.len() as u64);
    if !bytes.is_empty() {
        h.update(bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::hash::Hash;

    fn digest(f: impl FnOnce(&mut HashBuilder)) -> Hash {
        let mut h = Hash::sha256();
        f(&mut h);
        h.finalize()
    }

    #[test]
    fn zero_encodes_as_single_zero_byte() {
        let canonical = digest(|h| write_uint(h, &BigUint::zero()));
        let manual = digest(|h| h.update(&[0u8]));
        assert_eq!(canonical, manual);
    }

    #[test]
    fn nonzero_encodes_length_then_magnitude() {
        let n = BigUint::from(0x01_02_03u32);
        let canonical = digest(|h| write_uint(h, &n));
        let manual = digest(|h| h.update(&[3, 1, 2, 3]));
        assert_eq!(canonical, manual);
    }

    #[test]
    fn no_leading_zero_in_magnitude() {
        // 256 = 0x0100: two magnitude bytes, the leading one meaningful.
        let n = BigUint::from(256u32);
        let canonical = digest(|h| write_uint(h, &n));
        let manual = digest(|h| h.update(&[2, 1, 0]));
        assert_eq!(canonical, manual);
    }

    #[test]
    fn distinct_integers_encode_distinctly() {
        let a = digest(|h| write_uint(h, &BigUint::from(1u8)));
        let b = digest(|h| write_uint(h, &BigUint::from(256u16)));
        assert_ne!(a, b);
    }

    #[test]
    fn uint_fits_at_boundary() {
        let max = BigUint::from_bytes_be(&[0xFFu8; MAX_INT_MAGNITUDE]);
        assert!(uint_fits(&max));
        let over = BigUint::from_bytes_be(&[0x01u8; MAX_INT_MAGNITUDE + 1]);
        assert!(!uint_fits(&over));
        assert!(uint_fits(&BigUint::zero()));
    }

    #[test]
    #[should_panic(expected = "canonical integer encoding overflow")]
    fn oversized_magnitude_panics() {
        let over = BigUint::from_bytes_be(&[0x01u8; MAX_INT_MAGNITUDE + 1]);
        let mut h = Hash::sha256();
        write_uint(&mut h, &over);
    }

    #[test]
    fn u64_is_big_endian_fixed_width() {
        let canonical = digest(|h| write_u64(h, 0x0102));
        let manual = digest(|h| h.update(&[0, 0, 0, 0, 0, 0, 1, 2]));
        assert_eq!(canonical, manual);
    }

    #[test]
    fn bytes_are_length_prefixed() {
        let canonical = digest(|h| write_bytes(h, b"ab"));
        let manual = digest(|h| {
            h.update(&2u64.to_be_bytes());
            h.update(b"ab");
        });
        assert_eq!(canonical, manual);

        let empty = digest(|h| write_bytes(h, b""));
        let manual_empty = digest(|h| h.update(&0u64.to_be_bytes()));
        assert_eq!(empty, manual_empty);
    }
}
