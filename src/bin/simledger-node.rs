#![forbid(unsafe_code)]
//! Ledger node: loads the configured store and serves the REST API

use simledger::node::Node;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let node = Arc::new(Node::init().await?);
    node.start().await
}
