use crate::access::{denial_message, AccessGuard, OpenAccess};
use crate::crypto::{compute_block_hash, hex_hash, Address, Sha256Hash, GENESIS_PREVIOUS_HASH};
use crate::error::ChainError;
use crate::mempool::Mempool;
use crate::persistence::{InMemoryPersistence, Persistence};
use crate::transaction::{BasicValidator, Transaction, TransactionValidator};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::validation::verify_blocks;

/// Genesis timestamp: 2023-01-01T00:00:00Z in milliseconds.
pub const GENESIS_TIMESTAMP: u64 = 1672531200000;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: u64,
    #[serde(with = "hex_hash")]
    pub previous_hash: Sha256Hash,
    #[serde(with = "hex_hash")]
    pub hash: Sha256Hash,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(
        index: u64,
        previous_hash: Sha256Hash,
        transactions: Vec<Transaction>,
        timestamp: u64,
    ) -> Self {
        let hash = compute_block_hash(index, &previous_hash, &transactions, timestamp);
        Block {
            index,
            timestamp,
            previous_hash,
            hash,
            transactions,
        }
    }

    pub fn genesis() -> Self {
        Block::new(0, GENESIS_PREVIOUS_HASH, Vec::new(), GENESIS_TIMESTAMP)
    }

    /// Recomputes the hash from the stored fields.
    pub fn calculate_hash(&self) -> Sha256Hash {
        compute_block_hash(self.index, &self.previous_hash, &self.transactions, self.timestamp)
    }

    pub fn hash_str(&self) -> String {
        hex::encode(self.hash)
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }
}

/// A ledger shared between tasks. Every mutation runs under the write guard,
/// which makes `add_transaction` and `mine_block` mutually exclusive.
pub type SharedLedger = Arc<RwLock<Blockchain>>;

fn current_timestamp() -> u64 {
    chrono::Utc::now().timestamp_millis() as u64
}

pub struct Blockchain {
    pub(crate) blocks: Vec<Block>,
    mempool: Mempool,
    persistence: Box<dyn Persistence>,
    guard: Box<dyn AccessGuard>,
    validator: Box<dyn TransactionValidator>,
    integrity_fault: Option<String>,
}

impl Blockchain {
    /// Create a new `Blockchain` using an in-memory persistence backend.
    pub fn new() -> Result<Self, ChainError> {
        Self::new_with_persistence(Box::new(InMemoryPersistence::new()))
    }

    /// Open a `Blockchain` on the provided persistence backend.
    ///
    /// An empty store receives a freshly built genesis block. A non-empty store
    /// is verified block by block and refused if any link or hash is wrong.
    pub fn new_with_persistence(persistence: Box<dyn Persistence>) -> Result<Self, ChainError> {
        let blocks = Self::load_or_create(persistence.as_ref())?;
        verify_blocks(&blocks)?;
        info!(length = blocks.len(), "Loaded chain from storage");
        Ok(Self::from_blocks(blocks, persistence))
    }

    /// Open a store for inspection without refusing a corrupt chain.
    ///
    /// The chain is audited instead: a failed check is latched as an
    /// integrity fault (see [`Blockchain::integrity_fault`]) and mining stays
    /// halted, while reads still work.
    pub fn open_for_inspection(persistence: Box<dyn Persistence>) -> Result<Self, ChainError> {
        let blocks = Self::load_or_create(persistence.as_ref())?;
        let mut chain = Self::from_blocks(blocks, persistence);
        let _ = chain.audit_chain();
        Ok(chain)
    }

    fn load_or_create(persistence: &dyn Persistence) -> Result<Vec<Block>, ChainError> {
        let mut blocks = persistence.load_blocks()?;
        if blocks.is_empty() {
            let genesis = Block::genesis();
            persistence.save_block(&genesis)?;
            info!(hash = %genesis.hash_str(), "Created genesis block");
            blocks.push(genesis);
        }
        Ok(blocks)
    }

    fn from_blocks(blocks: Vec<Block>, persistence: Box<dyn Persistence>) -> Self {
        Blockchain {
            blocks,
            mempool: Mempool::new(),
            persistence,
            guard: Box::new(OpenAccess),
            validator: Box::new(BasicValidator::default()),
            integrity_fault: None,
        }
    }

    pub fn with_access_guard(mut self, guard: Box<dyn AccessGuard>) -> Self {
        self.guard = guard;
        self
    }

    pub fn with_validator(mut self, validator: Box<dyn TransactionValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn into_shared(self) -> SharedLedger {
        Arc::new(RwLock::new(self))
    }

    /// Number of blocks, genesis included. Never less than 1.
    pub fn chain_length(&self) -> u64 {
        self.blocks.len() as u64
    }

    pub fn get_block(&self, index: u64) -> Result<&Block, ChainError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.blocks.get(i))
            .ok_or(ChainError::IndexOutOfRange {
                index,
                length: self.chain_length(),
            })
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn last_block(&self) -> &Block {
        // The chain starts with its genesis block and never shrinks.
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn mempool(&self) -> &Mempool {
        &self.mempool
    }

    pub fn pending_count(&self) -> usize {
        self.mempool.len()
    }

    pub fn access_policy(&self) -> &'static str {
        self.guard.policy()
    }

    pub fn integrity_fault(&self) -> Option<&str> {
        self.integrity_fault.as_deref()
    }

    /// Queue a transaction for the next block.
    pub fn add_transaction(
        &mut self,
        caller: &Address,
        payload: impl Into<String>,
    ) -> Result<(), ChainError> {
        if !self.guard.authorize(caller) {
            return Err(ChainError::Unauthorized(denial_message(
                self.guard.as_ref(),
                caller,
                "submit transactions",
            )));
        }

        let tx = Transaction::new(payload)?;
        self.validator.validate(&tx)?;
        self.mempool.add_transaction(tx);

        debug!(pending = self.mempool.len(), "Transaction queued");
        Ok(())
    }

    /// Seal every pending transaction into a new block and append it.
    ///
    /// An empty pool still produces a block. If storage rejects the block the
    /// drained transactions go back to the front of the pool. When the reason
    /// is another writer having extended the store, its blocks are adopted
    /// and `StoreAdvanced` is returned so the caller can mine again.
    pub fn mine_block(&mut self, caller: &Address) -> Result<Block, ChainError> {
        if !self.guard.authorize(caller) {
            return Err(ChainError::Unauthorized(denial_message(
                self.guard.as_ref(),
                caller,
                "mine blocks",
            )));
        }

        if let Some(fault) = &self.integrity_fault {
            return Err(ChainError::ChainIntegrity(format!(
                "Mining halted until the chain is repaired: {}",
                fault
            )));
        }

        let (index, previous_hash, tail_timestamp) = {
            let tail = self.last_block();
            (tail.index + 1, tail.hash, tail.timestamp)
        };
        let timestamp = current_timestamp().max(tail_timestamp);

        let transactions = self.mempool.drain_all();
        let block = Block::new(index, previous_hash, transactions, timestamp);

        if let Err(e) = self.persistence.save_block(&block) {
            warn!(index = block.index, error = %e, "Failed to persist mined block");
            self.mempool.requeue_front(block.transactions);
            return Err(self.catch_up_with_store()?.unwrap_or(e));
        }

        info!(
            index = block.index,
            hash = %block.hash_str(),
            transactions = block.transactions.len(),
            "Mined block"
        );
        self.blocks.push(block.clone());
        Ok(block)
    }

    /// Adopts blocks appended to the store by another writer.
    ///
    /// Returns `StoreAdvanced` when the in-memory chain was behind, `None`
    /// when the store holds nothing new. A store that no longer extends the
    /// in-memory chain latches an integrity fault.
    fn catch_up_with_store(&mut self) -> Result<Option<ChainError>, ChainError> {
        let stored = self.persistence.load_blocks()?;
        if stored.len() <= self.blocks.len() {
            return Ok(None);
        }

        let result = verify_blocks(&stored).and_then(|()| {
            if stored[..self.blocks.len()] == self.blocks[..] {
                Ok(())
            } else {
                Err(ChainError::ChainIntegrity(
                    "Stored chain diverges from the loaded chain".to_string(),
                ))
            }
        });
        if let Err(e) = result {
            warn!(error = %e, "Store was extended with an incompatible chain; mining halted");
            self.integrity_fault = Some(e.to_string());
            return Err(e);
        }

        let adopted = stored.len() - self.blocks.len();
        self.blocks = stored;
        info!(
            adopted,
            length = self.blocks.len(),
            "Reloaded blocks appended by another writer"
        );
        Ok(Some(ChainError::StoreAdvanced {
            length: self.chain_length(),
        }))
    }

    /// Read-only integrity check over the whole chain.
    pub fn verify_chain(&self) -> Result<(), ChainError> {
        verify_blocks(&self.blocks)
    }

    /// Verify the chain and, on failure, halt mining until the fault is cleared.
    pub fn audit_chain(&mut self) -> Result<(), ChainError> {
        if let Err(e) = self.verify_chain() {
            warn!(error = %e, "Chain integrity check failed; mining halted");
            self.integrity_fault = Some(e.to_string());
            return Err(e);
        }
        Ok(())
    }

    /// Lift a mining halt. The chain is verified again first.
    pub fn clear_integrity_fault(&mut self) -> Result<(), ChainError> {
        self.verify_chain()?;
        if self.integrity_fault.take().is_some() {
            info!("Chain integrity restored; mining resumed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{AllowList, OwnerOnly};
    use crate::crypto::address_from_string;
    use crate::transaction::BasicValidator;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn caller() -> Address {
        address_from_string("owner")
    }

    fn tx(payload: &str) -> Transaction {
        Transaction::new(payload).unwrap()
    }

    #[test]
    fn test_new_chain_has_only_genesis() {
        let chain = Blockchain::new().unwrap();
        assert_eq!(chain.chain_length(), 1);

        let genesis = chain.get_block(0).unwrap();
        assert_eq!(genesis.index, 0);
        assert_eq!(genesis.previous_hash, GENESIS_PREVIOUS_HASH);
        assert!(genesis.transactions.is_empty());
        assert_eq!(genesis.timestamp, GENESIS_TIMESTAMP);
        assert_eq!(genesis.hash, genesis.calculate_hash());
    }

    #[test]
    fn test_genesis_is_identical_across_chains() {
        let a = Blockchain::new().unwrap();
        let b = Blockchain::new().unwrap();
        assert_eq!(a.get_block(0).unwrap(), b.get_block(0).unwrap());
    }

    #[test]
    fn test_mine_two_blocks_scenario() {
        let mut chain = Blockchain::new().unwrap();
        let genesis_hash = chain.get_block(0).unwrap().hash;

        chain.add_transaction(&caller(), "A").unwrap();
        chain.add_transaction(&caller(), "B").unwrap();
        let first = chain.mine_block(&caller()).unwrap();
        assert_eq!(first.index, 1);
        assert_eq!(first.transactions, vec![tx("A"), tx("B")]);
        assert_eq!(first.previous_hash, genesis_hash);
        assert_eq!(chain.pending_count(), 0);

        chain.add_transaction(&caller(), "C").unwrap();
        let second = chain.mine_block(&caller()).unwrap();
        assert_eq!(second.index, 2);
        assert_eq!(second.transactions, vec![tx("C")]);
        assert_eq!(second.previous_hash, first.hash);

        assert_eq!(chain.chain_length(), 3);
        assert!(chain.verify_chain().is_ok());
    }

    #[test]
    fn test_mining_empty_pool_produces_block() {
        let mut chain = Blockchain::new().unwrap();
        let block = chain.mine_block(&caller()).unwrap();
        assert_eq!(block.index, 1);
        assert!(block.transactions.is_empty());
        assert_eq!(block.hash, block.calculate_hash());
    }

    #[test]
    fn test_timestamps_never_decrease() {
        let mut chain = Blockchain::new().unwrap();
        let mut previous = chain.last_block().timestamp;
        for _ in 0..5 {
            let block = chain.mine_block(&caller()).unwrap();
            assert!(block.timestamp >= previous);
            previous = block.timestamp;
        }
    }

    #[test]
    fn test_stored_hashes_reproduce() {
        let mut chain = Blockchain::new().unwrap();
        for round in 0..4 {
            for i in 0..round {
                chain.add_transaction(&caller(), format!("tx-{}-{}", round, i)).unwrap();
            }
            chain.mine_block(&caller()).unwrap();
        }
        for block in chain.blocks() {
            assert_eq!(block.hash, block.calculate_hash());
        }
    }

    #[test]
    fn test_blank_transaction_rejected_without_side_effects() {
        let mut chain = Blockchain::new().unwrap();
        chain.add_transaction(&caller(), "A").unwrap();

        let result = chain.add_transaction(&caller(), "");
        assert!(matches!(result, Err(ChainError::InvalidTransaction(_))));
        let result = chain.add_transaction(&caller(), "   ");
        assert!(matches!(result, Err(ChainError::InvalidTransaction(_))));

        assert_eq!(chain.pending_count(), 1);
    }

    #[test]
    fn test_get_block_out_of_range() {
        let chain = Blockchain::new().unwrap();
        assert_eq!(
            chain.get_block(1).unwrap_err(),
            ChainError::IndexOutOfRange { index: 1, length: 1 }
        );
        assert!(chain.get_block(u64::MAX).is_err());
    }

    #[test]
    fn test_unauthorized_caller_changes_nothing() {
        let owner = caller();
        let intruder = address_from_string("intruder");
        let mut chain = Blockchain::new()
            .unwrap()
            .with_access_guard(Box::new(OwnerOnly::new(owner)));

        chain.add_transaction(&owner, "A").unwrap();

        let result = chain.add_transaction(&intruder, "B");
        assert!(matches!(result, Err(ChainError::Unauthorized(_))));
        let result = chain.mine_block(&intruder);
        assert!(matches!(result, Err(ChainError::Unauthorized(_))));

        assert_eq!(chain.pending_count(), 1);
        assert_eq!(chain.chain_length(), 1);
        assert_eq!(chain.access_policy(), "owner");
    }

    #[test]
    fn test_allow_list_policy() {
        let alice = address_from_string("alice");
        let mut chain = Blockchain::new()
            .unwrap()
            .with_access_guard(Box::new(AllowList::new([alice])));

        chain.add_transaction(&alice, "A").unwrap();
        assert!(chain.mine_block(&alice).is_ok());
        assert!(chain.mine_block(&address_from_string("bob")).is_err());
    }

    #[test]
    fn test_custom_validator_invoked() {
        let mut chain = Blockchain::new()
            .unwrap()
            .with_validator(Box::new(BasicValidator::new(3)));

        chain.add_transaction(&caller(), "abc").unwrap();
        let result = chain.add_transaction(&caller(), "abcd");
        assert!(matches!(result, Err(ChainError::InvalidTransaction(_))));
        assert_eq!(chain.pending_count(), 1);
    }

    struct AcceptAll;

    impl TransactionValidator for AcceptAll {
        fn validate(&self, _tx: &Transaction) -> Result<(), ChainError> {
            Ok(())
        }
    }

    #[test]
    fn test_blank_payload_rejected_whatever_the_validator() {
        let mut chain = Blockchain::new()
            .unwrap()
            .with_validator(Box::new(AcceptAll));

        let result = chain.add_transaction(&caller(), " \t ");
        assert!(matches!(result, Err(ChainError::InvalidTransaction(_))));
        assert_eq!(chain.pending_count(), 0);
    }

    #[test]
    fn test_tampering_detected_and_mining_halted() {
        let mut chain = Blockchain::new().unwrap();
        chain.add_transaction(&caller(), "A").unwrap();
        chain.mine_block(&caller()).unwrap();
        chain.mine_block(&caller()).unwrap();

        let original = chain.blocks[1].transactions.clone();
        chain.blocks[1].transactions = vec![tx("forged")];

        assert!(matches!(chain.audit_chain(), Err(ChainError::ChainIntegrity(_))));
        assert!(chain.integrity_fault().is_some());
        assert!(matches!(
            chain.mine_block(&caller()),
            Err(ChainError::ChainIntegrity(_))
        ));

        // Still corrupt: the halt stays in place.
        assert!(chain.clear_integrity_fault().is_err());
        assert!(chain.integrity_fault().is_some());

        chain.blocks[1].transactions = original;
        chain.clear_integrity_fault().unwrap();
        assert!(chain.integrity_fault().is_none());
        assert_eq!(chain.mine_block(&caller()).unwrap().index, 3);
    }

    #[test]
    fn test_broken_link_detected() {
        let mut chain = Blockchain::new().unwrap();
        chain.mine_block(&caller()).unwrap();
        chain.mine_block(&caller()).unwrap();

        // Rehash block 2 over a wrong parent so only the link is broken.
        let forged = Block::new(2, [9u8; 32], Vec::new(), chain.blocks[2].timestamp);
        chain.blocks[2] = forged;

        let err = chain.verify_chain().unwrap_err();
        assert!(err.to_string().contains("previous hash"));
    }

    struct FlakyPersistence {
        inner: InMemoryPersistence,
        fail: Arc<AtomicBool>,
    }

    impl Persistence for FlakyPersistence {
        fn save_block(&self, block: &Block) -> Result<(), ChainError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(ChainError::DatabaseError("disk full".to_string()));
            }
            self.inner.save_block(block)
        }

        fn load_blocks(&self) -> Result<Vec<Block>, ChainError> {
            self.inner.load_blocks()
        }
    }

    #[test]
    fn test_failed_persist_leaves_state_unchanged() {
        let fail = Arc::new(AtomicBool::new(false));
        let mut chain = Blockchain::new_with_persistence(Box::new(FlakyPersistence {
            inner: InMemoryPersistence::new(),
            fail: fail.clone(),
        }))
        .unwrap();

        chain.add_transaction(&caller(), "A").unwrap();
        chain.add_transaction(&caller(), "B").unwrap();

        fail.store(true, Ordering::SeqCst);
        let result = chain.mine_block(&caller());
        assert!(matches!(result, Err(ChainError::DatabaseError(_))));
        assert_eq!(chain.chain_length(), 1);
        assert_eq!(chain.mempool().get_all_transactions(), vec![tx("A"), tx("B")]);

        fail.store(false, Ordering::SeqCst);
        let block = chain.mine_block(&caller()).unwrap();
        assert_eq!(block.transactions, vec![tx("A"), tx("B")]);
    }

    #[test]
    fn test_reopen_from_persistence() {
        let store = InMemoryPersistence::new();
        let mut chain = Blockchain::new_with_persistence(Box::new(store.clone())).unwrap();
        chain.add_transaction(&caller(), "A").unwrap();
        let mined = chain.mine_block(&caller()).unwrap();
        chain.add_transaction(&caller(), "pending").unwrap();

        let reopened = Blockchain::new_with_persistence(Box::new(store)).unwrap();
        assert_eq!(reopened.chain_length(), 2);
        assert_eq!(reopened.get_block(1).unwrap(), &mined);
        assert_eq!(reopened.pending_count(), 0);
    }

    #[test]
    fn test_corrupt_store_refused() {
        let store = InMemoryPersistence::new();
        let genesis = Block::genesis();
        let mut bad = Block::new(1, genesis.hash, vec![tx("A")], GENESIS_TIMESTAMP + 1);
        bad.transactions = vec![tx("B")];
        store.save_block(&genesis).unwrap();
        store.save_block(&bad).unwrap();

        let result = Blockchain::new_with_persistence(Box::new(store));
        assert!(matches!(result, Err(ChainError::ChainIntegrity(_))));
    }

    #[test]
    fn test_inspection_opens_corrupt_store_with_fault_latched() {
        let store = InMemoryPersistence::new();
        let genesis = Block::genesis();
        let mut bad = Block::new(1, genesis.hash, vec![tx("A")], GENESIS_TIMESTAMP + 1);
        bad.transactions = vec![tx("B")];
        store.save_block(&genesis).unwrap();
        store.save_block(&bad).unwrap();

        let mut chain = Blockchain::open_for_inspection(Box::new(store)).unwrap();
        assert_eq!(chain.chain_length(), 2);
        assert!(chain.integrity_fault().unwrap().contains("hash mismatch"));
        assert!(matches!(
            chain.mine_block(&caller()),
            Err(ChainError::ChainIntegrity(_))
        ));
    }

    #[test]
    fn test_inspection_of_healthy_store_has_no_fault() {
        let store = InMemoryPersistence::new();
        let mut chain = Blockchain::new_with_persistence(Box::new(store.clone())).unwrap();
        chain.mine_block(&caller()).unwrap();

        let inspected = Blockchain::open_for_inspection(Box::new(store)).unwrap();
        assert_eq!(inspected.chain_length(), 2);
        assert!(inspected.integrity_fault().is_none());
    }
}
