//! Pending transaction pool
//!
//! Transactions wait here, in submission order, until the next block is
//! mined. The pool is ephemeral: it is never persisted.

use crate::transaction::Transaction;
use std::collections::VecDeque;

#[derive(Debug, Clone, Default)]
pub struct Mempool {
    transactions: VecDeque<Transaction>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a transaction. Identical payloads are kept as distinct entries.
    pub fn add_transaction(&mut self, tx: Transaction) {
        self.transactions.push_back(tx);
    }

    /// Takes every pending transaction, leaving the pool empty.
    pub fn drain_all(&mut self) -> Vec<Transaction> {
        std::mem::take(&mut self.transactions).into()
    }

    /// Puts transactions back ahead of anything submitted since they were drained.
    pub fn requeue_front(&mut self, transactions: Vec<Transaction>) {
        for tx in transactions.into_iter().rev() {
            self.transactions.push_front(tx);
        }
    }

    pub fn get_all_transactions(&self) -> Vec<Transaction> {
        self.transactions.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}
