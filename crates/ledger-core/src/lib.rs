pub mod chain;
pub mod constants;
pub mod mine;
pub mod validation;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::borrow::Cow;

pub use chain::{AdoptError, Ledger, Reconciliation};
pub use mine::{Miner, MiningError};
pub use validation::{is_valid_block, is_valid_chain, validate_block, validate_chain, ValidationError};

/// Lowercase hex SHA-256 digest identifying a block.
pub type Hash = String;

/// A single ledger entry. Field names on the wire are fixed for interoperability.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub index: u64,
    pub previous_hash: Hash,
    pub timestamp: u64,
    pub data: Value,
    pub hash: Hash,
    /// Carried for compatibility, never consulted by the puzzle.
    #[serde(default)]
    pub difficulty: Option<u64>,
    pub nonce: u64,
}

impl Block {
    pub fn new(
        index: u64,
        previous_hash: impl Into<Hash>,
        timestamp: u64,
        data: Value,
        hash: impl Into<Hash>,
        difficulty: Option<u64>,
        nonce: u64,
    ) -> Self {
        Self {
            index,
            previous_hash: previous_hash.into(),
            timestamp,
            data,
            hash: hash.into(),
            difficulty,
            nonce,
        }
    }

    /// Recompute the fingerprint from this block's own fields.
    pub fn calculate_hash(&self) -> Hash {
        fingerprint(
            self.index,
            &self.previous_hash,
            self.timestamp,
            &self.data,
            self.nonce,
        )
    }
}

/// SHA-256 over `index ‖ previous_hash ‖ timestamp ‖ data ‖ nonce` rendered as text.
///
/// String payloads contribute their raw characters; any other payload
/// contributes its compact JSON text.
pub fn fingerprint(index: u64, previous_hash: &str, timestamp: u64, data: &Value, nonce: u64) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(index.to_string());
    hasher.update(previous_hash);
    hasher.update(timestamp.to_string());
    hasher.update(render_payload(data).as_bytes());
    hasher.update(nonce.to_string());
    hex::encode(hasher.finalize())
}

fn render_payload(data: &Value) -> Cow<'_, str> {
    match data {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        other => Cow::Owned(other.to_string()),
    }
}

/// The root every node agrees on without a handshake.
pub fn genesis_block() -> Block {
    Block::new(
        0,
        constants::GENESIS_PREVIOUS_HASH,
        constants::GENESIS_TIMESTAMP,
        Value::String(constants::GENESIS_DATA.to_string()),
        constants::GENESIS_HASH,
        Some(0),
        0,
    )
}

pub mod pow {
    use crate::constants::PUZZLE_TAIL_HEX_LEN;

    /// Parse the last four hex digits of `hash` as an unsigned integer.
    pub fn tail_value(hash: &str) -> Option<u16> {
        let start = hash.len().checked_sub(PUZZLE_TAIL_HEX_LEN)?;
        let tail = hash.get(start..)?;
        u16::from_str_radix(tail, 16).ok()
    }

    pub fn is_prime(n: u32) -> bool {
        if n < 2 {
            return false;
        }
        if n % 2 == 0 {
            return n == 2;
        }
        let mut i = 3;
        while i * i <= n {
            if n % i == 0 {
                return false;
            }
            i += 2;
        }
        true
    }

    /// True when the hash tail is prime.
    pub fn satisfies_puzzle(hash: &str) -> bool {
        tail_value(hash).is_some_and(|v| is_prime(u32::from(v)))
    }
}
