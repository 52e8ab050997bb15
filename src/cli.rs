//! Shared helpers for the command-line binaries

use crate::blockchain::Blockchain;
use crate::config::{load_config, Config};
use crate::crypto::{address_from_hex, Address, ANONYMOUS_CALLER};
use crate::error::ChainError;
use crate::persistence::Database;
use chrono::{TimeZone, Utc};
use std::fs;
use std::path::Path;

/// Opens the ledger stored at the configured database path, applying the
/// configured access policy and transaction limits.
pub fn load_blockchain_from_config() -> Result<(Config, Blockchain), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let chain = open_blockchain(&config)?;
    Ok((config, chain))
}

pub fn open_blockchain(config: &Config) -> Result<Blockchain, ChainError> {
    let chain = Blockchain::new_with_persistence(Box::new(open_database(config)?))?;
    apply_policies(chain, config)
}

/// Like [`open_blockchain`], but a corrupt store is loaded with its integrity
/// fault latched instead of being refused, so it can be displayed.
pub fn inspect_blockchain(config: &Config) -> Result<Blockchain, ChainError> {
    let chain = Blockchain::open_for_inspection(Box::new(open_database(config)?))?;
    apply_policies(chain, config)
}

fn open_database(config: &Config) -> Result<Database, ChainError> {
    if let Some(parent) = Path::new(&config.database.path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Database::open(&config.database.path)
}

fn apply_policies(chain: Blockchain, config: &Config) -> Result<Blockchain, ChainError> {
    Ok(chain
        .with_access_guard(config.access_guard()?)
        .with_validator(Box::new(config.validator())))
}

/// Parses an optional `--caller` argument; absent means the anonymous caller.
pub fn parse_caller_arg(arg: Option<&str>) -> Result<Address, ChainError> {
    match arg {
        None => Ok(ANONYMOUS_CALLER),
        Some(hex_str) => address_from_hex(hex_str),
    }
}

/// `abcdef12...34567890` style shortening for table output.
pub fn short_hash(hash_hex: &str) -> String {
    if hash_hex.len() > 20 {
        format!("{}...{}", &hash_hex[..8], &hash_hex[hash_hex.len() - 8..])
    } else {
        hash_hex.to_string()
    }
}

pub fn format_timestamp(millis: u64) -> String {
    match Utc.timestamp_millis_opt(millis as i64).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string(),
        None => millis.to_string(),
    }
}
