use crate::crypto::GENESIS_PREVIOUS_HASH;
use crate::error::ChainError;

use super::chain::Block;

/// Checks that a block's stored hash matches its contents.
pub fn verify_block_hash(block: &Block) -> Result<(), ChainError> {
    let expected = block.calculate_hash();
    if block.hash != expected {
        return Err(ChainError::ChainIntegrity(format!(
            "Block {} hash mismatch. Stored {}, recomputed {}.",
            block.index,
            hex::encode(block.hash),
            hex::encode(expected)
        )));
    }
    Ok(())
}

/// Checks that `block` directly extends `previous`.
pub fn verify_link(previous: &Block, block: &Block) -> Result<(), ChainError> {
    if block.index != previous.index + 1 {
        return Err(ChainError::ChainIntegrity(format!(
            "Invalid block index. Expected {}, but got {}.",
            previous.index + 1,
            block.index
        )));
    }

    if block.previous_hash != previous.hash {
        return Err(ChainError::ChainIntegrity(format!(
            "Block {} previous hash mismatch. Expected {}, but got {}.",
            block.index,
            hex::encode(previous.hash),
            hex::encode(block.previous_hash)
        )));
    }
    Ok(())
}

/// Walks an entire chain, genesis first.
pub fn verify_blocks(blocks: &[Block]) -> Result<(), ChainError> {
    let genesis = blocks
        .first()
        .ok_or_else(|| ChainError::ChainIntegrity("Chain has no genesis block".to_string()))?;

    if genesis.index != 0 {
        return Err(ChainError::ChainIntegrity(format!(
            "First block has index {}, expected 0",
            genesis.index
        )));
    }
    if genesis.previous_hash != GENESIS_PREVIOUS_HASH {
        return Err(ChainError::ChainIntegrity(
            "Genesis block does not carry the sentinel previous hash".to_string(),
        ));
    }
    verify_block_hash(genesis)?;

    for pair in blocks.windows(2) {
        verify_link(&pair[0], &pair[1])?;
        verify_block_hash(&pair[1])?;
    }
    Ok(())
}
