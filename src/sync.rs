//! Chain change notifications and state re-fetch
//!
//! Front ends observe the ledger from outside: they subscribe to
//! [`ChainEvent`]s and, whenever they reconnect, pull a full
//! [`ChainSnapshot`] instead of trying to replay what they missed.

use crate::blockchain::{Block, SharedLedger};
use serde::Serialize;
use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChainEvent {
    TransactionAdded { pending: usize },
    BlockMined { index: u64, hash: String, transactions: usize },
}

impl ChainEvent {
    pub fn block_mined(block: &Block) -> Self {
        ChainEvent::BlockMined {
            index: block.index,
            hash: block.hash_str(),
            transactions: block.transactions.len(),
        }
    }
}

/// Fan-out of ledger events. Publishing with no subscribers is not an error.
#[derive(Debug, Clone)]
pub struct ChainEvents {
    sender: broadcast::Sender<ChainEvent>,
}

impl ChainEvents {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn publish(&self, event: ChainEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChainEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChainEvents {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a viewer needs to redraw the chain.
#[derive(Debug, Clone, Serialize)]
pub struct ChainSnapshot {
    pub length: u64,
    pub pending: usize,
    pub blocks: Vec<Block>,
}

pub async fn fetch_snapshot(ledger: &SharedLedger) -> ChainSnapshot {
    let chain = ledger.read().await;
    ChainSnapshot {
        length: chain.chain_length(),
        pending: chain.pending_count(),
        blocks: chain.blocks().to_vec(),
    }
}

/// Implemented by whatever renders ledger state.
pub trait ChainObserver: Send + Sync {
    fn on_reconnect(&self, snapshot: ChainSnapshot);
}

/// Re-fetch chain state and hand it to the observer.
pub async fn resync(ledger: &SharedLedger, observer: &dyn ChainObserver) {
    let snapshot = fetch_snapshot(ledger).await;
    tracing::debug!(length = snapshot.length, "Resynced observer");
    observer.on_reconnect(snapshot);
}
