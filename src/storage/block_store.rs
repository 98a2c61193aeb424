use crate::core::Block;
use crate::error::{BlockchainError, Result};
use data_encoding::HEXLOWER;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, Tree};
use std::path::Path;

// Key holding the hash of the newest block
pub const TIP_BLOCK_HASH_KEY: &str = "lh";
const BLOCKS_TREE: &str = "blocks";

/// Append-only block storage: block hash -> serialized block, plus the tip key.
///
/// There is no update or delete operation.
#[derive(Clone)]
pub struct BlockStore {
    db: Db,
    blocks: Tree,
}

impl BlockStore {
    pub fn open(path: &Path) -> Result<BlockStore> {
        let db = sled::open(path)
            .map_err(|e| BlockchainError::Database(format!("Failed to open database: {e}")))?;
        let blocks = db
            .open_tree(BLOCKS_TREE)
            .map_err(|e| BlockchainError::Database(format!("Failed to open blocks tree: {e}")))?;
        Ok(BlockStore { db, blocks })
    }

    pub fn get_tip_hash(&self) -> Result<Option<Vec<u8>>> {
        let tip = self
            .blocks
            .get(TIP_BLOCK_HASH_KEY)
            .map_err(|e| BlockchainError::Database(format!("Failed to get tip hash: {e}")))?;
        Ok(tip.map(|bytes| bytes.to_vec()))
    }

    /// Look a block up by hash. A miss is `Ok(None)`.
    pub fn get_block(&self, block_hash: &[u8]) -> Result<Option<Block>> {
        let bytes = self
            .blocks
            .get(block_hash)
            .map_err(|e| BlockchainError::Database(format!("Failed to get block: {e}")))?;
        match bytes {
            Some(bytes) => {
                let block = Block::deserialize(bytes.as_ref()).map_err(|e| {
                    BlockchainError::Corruption(format!(
                        "Block {} is unreadable: {e}",
                        HEXLOWER.encode(block_hash)
                    ))
                })?;
                Ok(Some(block))
            }
            None => Ok(None),
        }
    }

    /// Store `block` and move the tip to it in one atomic write
    pub fn put_block_and_tip(&self, block: &Block) -> Result<()> {
        let block_hash = block.get_hash();
        let block_data = block.serialize()?;

        self.blocks
            .transaction(|tx_db| {
                tx_db.insert(block_hash, block_data.as_slice())?;
                tx_db.insert(TIP_BLOCK_HASH_KEY, block_hash)?;
                Ok::<(), ConflictableTransactionError<()>>(())
            })
            .map_err(|e: TransactionError<()>| {
                BlockchainError::Database(format!("Failed to update blocks tree: {e:?}"))
            })?;
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MiningSettings;
    use crate::core::Transaction;
    use tempfile::tempdir;

    #[test]
    fn test_empty_store_has_no_tip() {
        let dir = tempdir().unwrap();
        let store = BlockStore::open(dir.path()).unwrap();
        assert!(store.get_tip_hash().unwrap().is_none());
        assert!(store.get_block(&[0u8; 32]).unwrap().is_none());
    }

    #[test]
    fn test_put_block_moves_tip() {
        let dir = tempdir().unwrap();
        let store = BlockStore::open(dir.path()).unwrap();
        let coinbase =
            Transaction::new_coinbase_tx("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa", "store").unwrap();
        let block = Block::generate_genesis_block(&coinbase, &MiningSettings::default()).unwrap();

        store.put_block_and_tip(&block).unwrap();
        assert_eq!(store.get_tip_hash().unwrap().unwrap(), block.get_hash());
        assert_eq!(store.get_block(block.get_hash()).unwrap().unwrap(), block);
    }
}
