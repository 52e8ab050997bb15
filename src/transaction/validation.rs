/// Validation logic for transactions separated from type definitions
use crate::error::ChainError;
use crate::transaction::types::{Transaction, MAX_TRANSACTION_SIZE};

/// Hook invoked by the ledger before a transaction enters the pool.
///
/// Implementations may add balance, signature or format checks; the ledger
/// only requires that a rejection is reported as `InvalidTransaction`.
pub trait TransactionValidator: Send + Sync {
    fn validate(&self, tx: &Transaction) -> Result<(), ChainError>;
}

/// Payloads up to a maximum byte size.
#[derive(Debug, Clone)]
pub struct BasicValidator {
    pub max_size: usize,
}

impl BasicValidator {
    pub fn new(max_size: usize) -> Self {
        Self { max_size }
    }
}

impl Default for BasicValidator {
    fn default() -> Self {
        Self::new(MAX_TRANSACTION_SIZE)
    }
}

impl TransactionValidator for BasicValidator {
    fn validate(&self, tx: &Transaction) -> Result<(), ChainError> {
        if tx.len() > self.max_size {
            return Err(ChainError::InvalidTransaction(format!(
                "Transaction too large: {} bytes (max: {})",
                tx.len(),
                self.max_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_validator_accepts_normal_payload() {
        let validator = BasicValidator::default();
        assert!(validator.validate(&Transaction::new("A").unwrap()).is_ok());
    }

    #[test]
    fn test_basic_validator_rejects_oversized_payload() {
        let validator = BasicValidator::new(4);
        let tx = Transaction::new("12345").unwrap();

        let result = validator.validate(&tx);
        if let Err(ChainError::InvalidTransaction(msg)) = result {
            assert!(msg.contains("too large"));
        } else {
            panic!("Expected InvalidTransaction error");
        }
    }

    #[test]
    fn test_size_limit_is_inclusive() {
        let validator = BasicValidator::new(4);
        assert!(validator.validate(&Transaction::new("1234").unwrap()).is_ok());
    }
}
