use crate::blockchain::{Blockchain, SharedLedger};
use crate::config::{load_config, Config};
use crate::persistence::{Database, InMemoryPersistence, Persistence};
use crate::sync::{ChainEvent, ChainEvents};
use std::fs;
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

const STATUS_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeState {
    Booting,
    Verifying,
    Ready,
    Degraded,
}

pub struct Node {
    pub config: Config,
    pub ledger: SharedLedger,
    pub events: ChainEvents,
    pub state: Arc<RwLock<NodeState>>,
}

impl Node {
    pub async fn init() -> Result<Self, Box<dyn std::error::Error>> {
        // Load and validate config
        let config = load_config()?;

        tracing_subscriber::fmt::init();
        info!(
            "Starting SimLedger node (access policy = {:?})",
            config.ledger.access_policy
        );

        let ledger = Self::open_ledger(&config)?;
        Ok(Self::from_parts(config, ledger))
    }

    /// Wires an already-built ledger into a node. Used by `init` and tests.
    pub fn from_parts(config: Config, blockchain: Blockchain) -> Self {
        Self {
            config,
            ledger: blockchain.into_shared(),
            events: ChainEvents::new(),
            state: Arc::new(RwLock::new(NodeState::Booting)),
        }
    }

    fn open_ledger(config: &Config) -> Result<Blockchain, Box<dyn std::error::Error>> {
        // Ensure data directory (parent of DB path) exists
        let db_path = std::path::Path::new(&config.database.path);
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| format!("Failed to create data dir {:?}: {}", parent, e))?;
            }
        }

        let persistence: Box<dyn Persistence> = match Database::open(&config.database.path) {
            Ok(db) => Box::new(db),
            Err(e) => {
                warn!(
                    "Failed to open DB at {}: {}. Falling back to in-memory persistence.",
                    config.database.path, e
                );
                Box::new(InMemoryPersistence::new())
            }
        };

        // A store that fails verification is refused outright rather than replaced.
        let blockchain = Blockchain::new_with_persistence(persistence)
            .map_err(|e| format!("Failed to load ledger: {}", e))?
            .with_access_guard(config.access_guard()?)
            .with_validator(Box::new(config.validator()));

        Ok(blockchain)
    }

    /// Re-verifies the loaded chain and moves the node to `Ready` or `Degraded`.
    pub async fn verify(&self) -> NodeState {
        *self.state.write().await = NodeState::Verifying;

        let result = self.ledger.write().await.audit_chain();
        let next = match result {
            Ok(()) => NodeState::Ready,
            Err(e) => {
                error!("Ledger failed verification: {}", e);
                NodeState::Degraded
            }
        };
        *self.state.write().await = next.clone();
        next
    }

    pub async fn start(self: Arc<Self>) -> Result<(), Box<dyn std::error::Error>> {
        // Ensure API port is available before going further
        let api_port = self.config.network.api_port;
        let api_bind = format!("0.0.0.0:{}", api_port);
        TcpListener::bind(&api_bind)
            .map_err(|e| format!("API port {} unavailable: {}", api_port, e))?;

        let state = self.verify().await;
        info!("Node state after verification: {:?}", state);

        // Log every ledger change
        let mut rx = self.events.subscribe();
        tokio::spawn(async move {
            while let Ok(event) = rx.recv().await {
                match event {
                    ChainEvent::TransactionAdded { pending } => {
                        info!(pending, "Transaction accepted into pool");
                    }
                    ChainEvent::BlockMined {
                        index,
                        hash,
                        transactions,
                    } => {
                        info!(index, %hash, transactions, "Block appended");
                    }
                }
            }
        });

        let node = self.clone();
        tokio::spawn(async move {
            if let Err(e) = Node::start_api(node, api_port).await {
                error!("API server failed: {}", e);
            }
        });

        // Node main loop - health logging
        loop {
            {
                let chain = self.ledger.read().await;
                match chain.integrity_fault() {
                    Some(fault) => warn!(
                        "Node degraded: chain length = {}, integrity fault: {}",
                        chain.chain_length(),
                        fault
                    ),
                    None => info!(
                        "Node running: chain length = {}, pending = {}",
                        chain.chain_length(),
                        chain.pending_count()
                    ),
                }
            }
            tokio::time::sleep(STATUS_INTERVAL).await;
        }
    }

    #[cfg(feature = "api")]
    async fn start_api(node: Arc<Self>, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        // The API observes the same ledger, event bus and state as the node.
        let api_node = crate::api::ApiNode::new_shared(
            node.ledger.clone(),
            node.events.clone(),
            Some(node.state.clone()),
        );

        crate::api::run_api_server(Arc::new(api_node), port).await
    }

    #[cfg(not(feature = "api"))]
    async fn start_api(_node: Arc<Self>, _port: u16) -> Result<(), Box<dyn std::error::Error>> {
        Err("API feature not enabled in this build".into())
    }
}
