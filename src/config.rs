//! Configuration management for SimLedger

use crate::access::{AccessGuard, AllowList, OpenAccess, OwnerOnly};
use crate::crypto::decode_hash;
use crate::error::ChainError;
use crate::transaction::{BasicValidator, MAX_TRANSACTION_SIZE};
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_api_port")]
    pub api_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AccessPolicy {
    #[default]
    Open,
    Owner,
    AllowList,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub access_policy: AccessPolicy,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub allowed_callers: Vec<String>,
    #[serde(default = "default_max_transaction_size")]
    pub max_transaction_size: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            access_policy: AccessPolicy::default(),
            owner: None,
            allowed_callers: Vec::new(),
            max_transaction_size: default_max_transaction_size(),
        }
    }
}

impl Config {
    pub fn from_toml(source: &str) -> Result<Self, ChainError> {
        let config: Config = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate critical values
    pub fn validate(&self) -> Result<(), ChainError> {
        if self.database.path.is_empty() {
            return Err(ChainError::ConfigError(
                "database.path must be set in config.toml".to_string(),
            ));
        }

        if self.ledger.max_transaction_size == 0 {
            return Err(ChainError::ConfigError(
                "ledger.max_transaction_size must be greater than zero".to_string(),
            ));
        }

        // Building the guard checks owner / allow-list addresses.
        self.access_guard().map(|_| ())
    }

    pub fn access_guard(&self) -> Result<Box<dyn AccessGuard>, ChainError> {
        match self.ledger.access_policy {
            AccessPolicy::Open => Ok(Box::new(OpenAccess)),
            AccessPolicy::Owner => {
                let owner = self.ledger.owner.as_deref().ok_or_else(|| {
                    ChainError::ConfigError(
                        "ledger.owner must be set when access_policy = \"owner\"".to_string(),
                    )
                })?;
                Ok(Box::new(OwnerOnly::new(parse_caller(owner)?)))
            }
            AccessPolicy::AllowList => {
                if self.ledger.allowed_callers.is_empty() {
                    return Err(ChainError::ConfigError(
                        "ledger.allowed_callers must not be empty when access_policy = \"allow_list\""
                            .to_string(),
                    ));
                }
                let callers = self
                    .ledger
                    .allowed_callers
                    .iter()
                    .map(String::as_str)
                    .map(parse_caller)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Box::new(AllowList::new(callers)))
            }
        }
    }

    pub fn validator(&self) -> BasicValidator {
        BasicValidator::new(self.ledger.max_transaction_size)
    }
}

fn parse_caller(hex_str: &str) -> Result<[u8; 32], ChainError> {
    decode_hash(hex_str)
        .map_err(|e| ChainError::ConfigError(format!("Invalid caller address '{}': {}", hex_str, e)))
}

/// Loads `config.toml` from the working directory, or defaults when absent.
pub fn load_config() -> Result<Config, ChainError> {
    load_config_from(DEFAULT_CONFIG_PATH)
}

pub fn load_config_from(path: impl AsRef<Path>) -> Result<Config, ChainError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Config::default());
    }
    let config_str = fs::read_to_string(path)?;
    Config::from_toml(&config_str)
}

fn default_api_port() -> u16 {
    3000
}

fn default_db_path() -> String {
    "./data/simledger.db".to_string()
}

fn default_max_transaction_size() -> usize {
    MAX_TRANSACTION_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{address_from_string, address_to_hex};

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.network.api_port, 3000);
        assert_eq!(config.database.path, "./data/simledger.db");
        assert_eq!(config.ledger.access_policy, AccessPolicy::Open);
        assert_eq!(config.ledger.max_transaction_size, MAX_TRANSACTION_SIZE);
        assert_eq!(config.access_guard().unwrap().policy(), "open");
    }

    #[test]
    fn test_owner_policy() {
        let owner = address_from_string("owner");
        let source = format!(
            "[ledger]\naccess_policy = \"owner\"\nowner = \"{}\"\n",
            address_to_hex(&owner)
        );
        let config = Config::from_toml(&source).unwrap();
        let guard = config.access_guard().unwrap();
        assert!(guard.authorize(&owner));
        assert!(!guard.authorize(&address_from_string("other")));
    }

    #[test]
    fn test_owner_policy_requires_owner() {
        let result = Config::from_toml("[ledger]\naccess_policy = \"owner\"\n");
        assert!(matches!(result, Err(ChainError::ConfigError(_))));
    }

    #[test]
    fn test_allow_list_policy_rejects_bad_address() {
        let result = Config::from_toml(
            "[ledger]\naccess_policy = \"allow_list\"\nallowed_callers = [\"zz\"]\n",
        );
        assert!(matches!(result, Err(ChainError::ConfigError(_))));
    }

    #[test]
    fn test_unknown_policy_rejected() {
        let result = Config::from_toml("[ledger]\naccess_policy = \"stake\"\n");
        assert!(matches!(result, Err(ChainError::ConfigError(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[network]\napi_port = 8088\n[database]\npath = \"ledger.db\"\n[ledger]\nmax_transaction_size = 64\n",
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.network.api_port, 8088);
        assert_eq!(config.database.path, "ledger.db");
        assert_eq!(config.validator().max_size, 64);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.network.api_port, 3000);
    }
}
