//! Typed JSON payloads and their conversions.
//!
//! Numbers that can exceed 64 bits travel as decimal strings; byte fields
//! travel as `0x`-prefixed hex. Every parse failure maps to
//! [`ChainError::MalformedInput`] so ingress can answer with a 4xx and the
//! offending field.

use crate::core::account::Account;
use crate::core::block::Block;
use crate::core::error::ChainError;
use crate::core::transaction::{Signature, Transaction};
use crate::core::vote::ValidatorVote;
use crate::core::witness::Witness;
use crate::types::address::Address;
use crate::types::hash::Hash;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Transaction submission payload (`POST /tx/send`, `POST /p2p/tx`).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxPayload {
    /// Decimal string; positive.
    pub chain_id: String,
    pub nonce: u64,
    pub to: Address,
    /// Decimal string.
    pub value: String,
    /// Decimal string.
    pub gas_price: String,
    pub gas_limit: u64,
    /// `0x`-prefixed hex, possibly empty (`0x`).
    pub data: String,
    /// `0x`-prefixed hex signature scalars.
    pub r: String,
    pub s: String,
    pub v: u8,
}

impl TryFrom<TxPayload> for Transaction {
    type Error = ChainError;

    fn try_from(p: TxPayload) -> Result<Transaction, ChainError> {
        Ok(Transaction::from_parts(
            parse_decimal("chainId", &p.chain_id)?,
            p.nonce,
            p.to,
            parse_decimal("value", &p.value)?,
            parse_decimal("gasPrice", &p.gas_price)?,
            p.gas_limit,
            parse_hex_bytes("data", &p.data)?,
            Signature {
                r: parse_hex_uint("r", &p.r)?,
                s: parse_hex_uint("s", &p.s)?,
                v: p.v,
            },
        ))
    }
}

impl From<&Transaction> for TxPayload {
    fn from(tx: &Transaction) -> TxPayload {
        TxPayload {
            chain_id: tx.chain_id.to_str_radix(10),
            nonce: tx.nonce,
            to: tx.to,
            value: tx.value.to_str_radix(10),
            gas_price: tx.gas_price.to_str_radix(10),
            gas_limit: tx.gas_limit,
            data: format!("0x{}", hex::encode(&tx.data)),
            r: format!("0x{}", tx.signature.r.to_str_radix(16)),
            s: format!("0x{}", tx.signature.s.to_str_radix(16)),
            v: tx.signature.v,
        }
    }
}

/// Chain head summary (`GET /chain/head`).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadSummary {
    pub height: u64,
    pub hash: Hash,
    pub state_root: Hash,
    pub tx_count: usize,
    pub proposer: Address,
}

impl From<&Block> for HeadSummary {
    fn from(block: &Block) -> HeadSummary {
        HeadSummary {
            height: block.header.height,
            hash: block.hash(),
            state_root: block.header.state_root,
            tx_count: block.transactions.len(),
            proposer: block.header.proposer,
        }
    }
}

/// Account query response (`GET /account/balance`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccountSummary {
    pub address: Address,
    /// Decimal string.
    pub balance: String,
    pub nonce: u64,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> AccountSummary {
        AccountSummary {
            address: account.address,
            balance: account.balance.to_str_radix(10),
            nonce: account.nonce,
        }
    }
}

/// Validator vote payload (`POST /validator/vote`).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotePayload {
    pub chain_id: u64,
    pub height: u64,
    pub block_hash: Hash,
    pub voter: Address,
    pub r: String,
    pub s: String,
    pub v: u8,
}

impl TryFrom<VotePayload> for ValidatorVote {
    type Error = ChainError;

    fn try_from(p: VotePayload) -> Result<ValidatorVote, ChainError> {
        Ok(ValidatorVote {
            chain_id: p.chain_id,
            height: p.height,
            block_hash: p.block_hash,
            voter: p.voter,
            signature: assemble_signature(&p.r, &p.s, p.v)?,
        })
    }
}

/// Witness payload (`POST /witness/submit`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WitnessPayload {
    pub height: u64,
    pub address: Address,
    pub hash: Hash,
    /// `0x`-prefixed hex of the 65-byte blob.
    pub signature: String,
}

impl TryFrom<WitnessPayload> for Witness {
    type Error = ChainError;

    fn try_from(p: WitnessPayload) -> Result<Witness, ChainError> {
        Ok(Witness {
            height: p.height,
            address: p.address,
            hash: p.hash,
            signature: parse_hex_bytes("signature", &p.signature)?,
        })
    }
}

fn parse_decimal(field: &str, s: &str) -> Result<BigUint, ChainError> {
    BigUint::from_str(s)
        .map_err(|_| ChainError::MalformedInput(format!("{field}: not a decimal integer: {s}")))
}

fn parse_hex_bytes(field: &str, s: &str) -> Result<Vec<u8>, ChainError> {
    let raw = s
        .strip_prefix("0x")
        .ok_or_else(|| ChainError::MalformedInput(format!("{field}: missing 0x prefix")))?;
    hex::decode(raw).map_err(|_| ChainError::MalformedInput(format!("{field}: invalid hex: {s}")))
}

fn parse_hex_uint(field: &str, s: &str) -> Result<BigUint, ChainError> {
    let raw = s
        .strip_prefix("0x")
        .ok_or_else(|| ChainError::MalformedInput(format!("{field}: missing 0x prefix")))?;
    if raw.is_empty() {
        return Err(ChainError::MalformedInput(format!("{field}: empty hex")));
    }
    BigUint::parse_bytes(raw.as_bytes(), 16)
        .ok_or_else(|| ChainError::MalformedInput(format!("{field}: invalid hex: {s}")))
}

/// Assembles a 65-byte blob from hex scalars, left-padding r and s.
fn assemble_signature(r: &str, s: &str, v: u8) -> Result<Vec<u8>, ChainError> {
    let r = parse_hex_uint("r", r)?.to_bytes_be();
    let s = parse_hex_uint("s", s)?.to_bytes_be();
    if r.len() > 32 || s.len() > 32 {
        return Err(ChainError::MalformedInput(
            "signature scalar longer than 32 bytes".into(),
        ));
    }
    let mut blob = vec![0u8; 65];
    blob[32 - r.len()..32].copy_from_slice(&r);
    blob[64 - s.len()..64].copy_from_slice(&s);
    blob[64] = v;
    Ok(blob)
}
