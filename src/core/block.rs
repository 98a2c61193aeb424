use crate::config::MiningSettings;
use crate::core::{ProofOfWork, Transaction};
use crate::error::{BlockchainError, Result};
use crate::utils::{deserialize, serialize};
use data_encoding::HEXLOWER;
use log::info;

#[derive(Debug, Clone, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct Block {
    hash: Vec<u8>,
    transactions: Vec<Transaction>,
    pre_block_hash: Vec<u8>, // empty only for genesis
    nonce: i64,
}

impl Block {
    /// Seal `transactions` on top of `pre_block_hash` by running proof-of-work
    pub fn new_block(
        pre_block_hash: &[u8],
        transactions: &[Transaction],
        mining: &MiningSettings,
    ) -> Result<Block> {
        if transactions.is_empty() {
            return Err(BlockchainError::InvalidBlock(
                "Block must contain at least one transaction".to_string(),
            ));
        }

        let pow = ProofOfWork::new(transactions, pre_block_hash);
        let (nonce, hash) = pow.run_parallel(mining.workers, mining.nonce_budget)?;
        info!(
            "Proof-of-work completed for block {} (nonce {nonce})",
            HEXLOWER.encode(&hash)
        );

        Ok(Block {
            hash,
            transactions: transactions.to_vec(),
            pre_block_hash: pre_block_hash.to_vec(),
            nonce,
        })
    }

    pub fn generate_genesis_block(coinbase: &Transaction, mining: &MiningSettings) -> Result<Block> {
        if !coinbase.is_coinbase() {
            return Err(BlockchainError::InvalidBlock(
                "Genesis block must hold a coinbase transaction".to_string(),
            ));
        }
        Block::new_block(&[], std::slice::from_ref(coinbase), mining)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Block> {
        deserialize::<Block>(bytes)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn get_pre_block_hash(&self) -> &[u8] {
        self.pre_block_hash.as_slice()
    }

    pub fn get_hash(&self) -> &[u8] {
        self.hash.as_slice()
    }

    pub fn get_nonce(&self) -> i64 {
        self.nonce
    }

    pub fn is_genesis(&self) -> bool {
        self.pre_block_hash.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn with_nonce(&self, nonce: i64) -> Block {
        Block {
            nonce,
            ..self.clone()
        }
    }
}
