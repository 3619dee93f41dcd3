//! secp256k1 key pairs and recoverable ECDSA signatures.

pub mod key_pair;

pub use key_pair::{CryptoError, PrivateKey, PublicKey, SIGNATURE_LEN, recover};
