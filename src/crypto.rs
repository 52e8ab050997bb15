//! Hashing primitives for SimLedger
//!
//! Block hashes are SHA-256 over a canonical byte encoding of the block
//! contents. The encoding is, in order:
//!
//! 1. `index` as a little-endian `u64`
//! 2. `previous_hash` as its raw 32 bytes
//! 3. the transaction count as a little-endian `u64`
//! 4. for each transaction: its payload length as a little-endian `u64`,
//!    followed by the UTF-8 payload bytes
//! 5. `timestamp` (milliseconds) as a little-endian `u64`
//!
//! Any two conforming implementations produce identical hashes for
//! identical block contents.

use crate::error::ChainError;
use crate::transaction::Transaction;
use sha2::{Digest, Sha256};

pub type Sha256Hash = [u8; 32];

/// Previous-hash sentinel carried by the genesis block.
pub const GENESIS_PREVIOUS_HASH: Sha256Hash = [0u8; 32];

/// Caller identity handed to access guards: a 32-byte opaque address.
pub type Address = [u8; 32];

/// Address used when a caller does not identify itself.
pub const ANONYMOUS_CALLER: Address = [0u8; 32];

/// Computes the hash of a block from its contents.
pub fn compute_block_hash(
    index: u64,
    previous_hash: &Sha256Hash,
    transactions: &[Transaction],
    timestamp: u64,
) -> Sha256Hash {
    let mut hasher = Sha256::new();
    hasher.update(index.to_le_bytes());
    hasher.update(previous_hash);
    hasher.update((transactions.len() as u64).to_le_bytes());
    for tx in transactions {
        let payload = tx.as_bytes();
        hasher.update((payload.len() as u64).to_le_bytes());
        hasher.update(payload);
    }
    hasher.update(timestamp.to_le_bytes());
    hasher.finalize().into()
}

/// Convenience function to create an address from a string (hashes the string).
/// Useful for testing and debugging.
pub fn address_from_string(s: &str) -> Address {
    Sha256::digest(s.as_bytes()).into()
}

pub fn address_to_hex(addr: &Address) -> String {
    hex::encode(addr)
}

pub fn address_from_hex(hex_str: &str) -> Result<Address, ChainError> {
    decode_hash(hex_str).map_err(|e| ChainError::InvalidAddress(format!("'{}': {}", hex_str, e)))
}

/// Decodes a 64-character hex string into 32 bytes.
pub fn decode_hash(hex_str: &str) -> Result<Sha256Hash, String> {
    let bytes = hex::decode(hex_str).map_err(|e| format!("invalid hex: {}", e))?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| format!("expected 32 bytes, got {}", b.len()))
}

/// Serde adapter rendering 32-byte hashes as lowercase hex strings.
pub mod hex_hash {
    use super::Sha256Hash;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(hash: &Sha256Hash, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(hash))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Sha256Hash, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::decode_hash(&s).map_err(serde::de::Error::custom)
    }
}
