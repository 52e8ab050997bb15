//! Database persistence layer for SimLedger
//!
//! Blocks are stored as ordered records keyed by index. The pending pool is
//! never written to storage.

use crate::blockchain::Block;
use crate::crypto::Sha256Hash;
use crate::error::ChainError;
use crate::transaction::Transaction;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

/// Abstraction for persistence backends. Blocks are append-only: saving a
/// block whose index is already stored must fail.
pub trait Persistence: Send + Sync {
    fn save_block(&self, block: &Block) -> Result<(), ChainError>;
    /// All stored blocks in ascending index order.
    fn load_blocks(&self) -> Result<Vec<Block>, ChainError>;
}

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &str) -> Result<Self, ChainError> {
        let conn = Connection::open(path)
            .map_err(|e| ChainError::DatabaseError(format!("Failed to open database: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS blocks (
                height INTEGER PRIMARY KEY,
                hash BLOB NOT NULL,
                previous_hash BLOB NOT NULL,
                timestamp INTEGER NOT NULL,
                transactions TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| ChainError::DatabaseError(format!("Failed to create blocks table: {}", e)))?;

        Ok(Database {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, ChainError> {
        self.conn
            .lock()
            .map_err(|_| ChainError::DatabaseError("Mutex poisoned".to_string()))
    }

    pub fn save_block(&self, block: &Block) -> Result<(), ChainError> {
        let transactions_json = serde_json::to_string(&block.transactions).map_err(|e| {
            ChainError::DatabaseError(format!("Failed to serialize transactions: {}", e))
        })?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO blocks (height, hash, previous_hash, timestamp, transactions)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                block.index as i64,
                block.hash.to_vec(),
                block.previous_hash.to_vec(),
                block.timestamp as i64,
                transactions_json,
            ],
        )
        .map_err(|e| {
            ChainError::DatabaseError(format!("Failed to save block {}: {}", block.index, e))
        })?;

        Ok(())
    }

    pub fn load_blocks(&self) -> Result<Vec<Block>, ChainError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT height, hash, previous_hash, timestamp, transactions
                 FROM blocks ORDER BY height ASC",
            )
            .map_err(|e| ChainError::DatabaseError(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], |row| {
                let height: i64 = row.get(0)?;
                let hash: Vec<u8> = row.get(1)?;
                let previous_hash: Vec<u8> = row.get(2)?;
                let timestamp: i64 = row.get(3)?;
                let transactions: String = row.get(4)?;
                Ok((height, hash, previous_hash, timestamp, transactions))
            })
            .map_err(|e| ChainError::DatabaseError(format!("Failed to query blocks: {}", e)))?;

        let mut blocks = Vec::new();
        for row in rows {
            let (height, hash, previous_hash, timestamp, transactions_json) =
                row.map_err(|e| ChainError::DatabaseError(format!("Failed to read row: {}", e)))?;

            let transactions: Vec<Transaction> = serde_json::from_str(&transactions_json)
                .map_err(|e| {
                    ChainError::DatabaseError(format!(
                        "Failed to deserialize transactions of block {}: {}",
                        height, e
                    ))
                })?;

            blocks.push(Block {
                index: height as u64,
                timestamp: timestamp as u64,
                previous_hash: hash_from_column(previous_hash, height)?,
                hash: hash_from_column(hash, height)?,
                transactions,
            });
        }

        Ok(blocks)
    }

    pub fn block_count(&self) -> Result<u64, ChainError> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM blocks", [], |row| row.get(0))
            .map_err(|e| ChainError::DatabaseError(format!("Failed to count blocks: {}", e)))?;
        Ok(count as u64)
    }
}

fn hash_from_column(bytes: Vec<u8>, height: i64) -> Result<Sha256Hash, ChainError> {
    bytes.try_into().map_err(|b: Vec<u8>| {
        ChainError::DatabaseError(format!(
            "Block {} has a {}-byte hash column, expected 32",
            height,
            b.len()
        ))
    })
}

// Implement the Persistence trait for the rusqlite-backed Database
impl Persistence for Database {
    fn save_block(&self, block: &Block) -> Result<(), ChainError> {
        Database::save_block(self, block)
    }

    fn load_blocks(&self) -> Result<Vec<Block>, ChainError> {
        Database::load_blocks(self)
    }
}

/// Simple in-memory persistence implementation useful for tests and ephemeral runs.
/// Clones share the same underlying storage.
#[derive(Clone, Default)]
pub struct InMemoryPersistence {
    blocks: Arc<Mutex<Vec<Block>>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blocks.lock().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Persistence for InMemoryPersistence {
    fn save_block(&self, block: &Block) -> Result<(), ChainError> {
        let mut blocks = self
            .blocks
            .lock()
            .map_err(|_| ChainError::DatabaseError("Mutex poisoned".to_string()))?;

        if block.index != blocks.len() as u64 {
            return Err(ChainError::DatabaseError(format!(
                "Block {} cannot be stored: next free index is {}",
                block.index,
                blocks.len()
            )));
        }
        blocks.push(block.clone());
        Ok(())
    }

    fn load_blocks(&self) -> Result<Vec<Block>, ChainError> {
        let blocks = self
            .blocks
            .lock()
            .map_err(|_| ChainError::DatabaseError("Mutex poisoned".to_string()))?;
        Ok(blocks.clone())
    }
}
