//! Error types for SimLedger

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    InvalidTransaction(String),
    Unauthorized(String),
    IndexOutOfRange { index: u64, length: u64 },
    ChainIntegrity(String),
    StoreAdvanced { length: u64 },
    InvalidAddress(String),
    DatabaseError(String),
    IoError(String),
    ConfigError(String),
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChainError::InvalidTransaction(msg) => write!(f, "Invalid transaction: {}", msg),
            ChainError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ChainError::IndexOutOfRange { index, length } => write!(
                f,
                "Block index {} out of range (chain length {})",
                index, length
            ),
            ChainError::ChainIntegrity(msg) => write!(f, "Chain integrity error: {}", msg),
            ChainError::StoreAdvanced { length } => write!(
                f,
                "Store was extended by another writer; chain reloaded at length {}",
                length
            ),
            ChainError::InvalidAddress(msg) => write!(f, "Invalid address: {}", msg),
            ChainError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            ChainError::IoError(msg) => write!(f, "IO error: {}", msg),
            ChainError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for ChainError {}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::ConfigError(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
