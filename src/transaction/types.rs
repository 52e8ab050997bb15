/// Transaction types for SimLedger
use crate::error::ChainError;
use std::fmt;

/// Maximum transaction payload size in bytes (100KB) to prevent DoS
pub const MAX_TRANSACTION_SIZE: usize = 100_000;

/// An opaque text payload recorded on the ledger.
///
/// A `Transaction` can only be built from a non-blank payload, so every
/// value that reaches the pool or a block is well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct Transaction(String);

impl Transaction {
    pub fn new(payload: impl Into<String>) -> Result<Self, ChainError> {
        let payload = payload.into();
        if payload.trim().is_empty() {
            return Err(ChainError::InvalidTransaction(
                "Transaction payload cannot be empty".to_string(),
            ));
        }
        Ok(Transaction(payload))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for Transaction {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let payload = String::deserialize(deserializer)?;
        Transaction::new(payload).map_err(serde::de::Error::custom)
    }
}
