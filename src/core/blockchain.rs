// The chain itself: an append-only list of sealed blocks in a sled tree, each
// pointing at its predecessor, with the newest block's hash kept under "lh".
// Walking always goes newest to oldest and ends at the genesis block.

use crate::config::{MiningSettings, Settings};
use crate::core::signature::PrevTransactions;
use crate::core::{Block, Transaction};
use crate::error::{BlockchainError, Result};
use crate::storage::BlockStore;
use crate::wallet::validate_address;
use data_encoding::HEXLOWER;
use log::{debug, info};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

pub const GENESIS_COINBASE_DATA: &str = "First Transaction from Genesis";

// (transaction id, output index)
type OutPoint = (Vec<u8>, usize);

#[derive(Default)]
struct ChainIndex {
    known_ids: HashSet<Vec<u8>>,
    spent: HashSet<OutPoint>,
}

// Checks that need nothing but the transaction itself
fn check_transaction_shape(transaction: &Transaction) -> Result<()> {
    let txid_hex = HEXLOWER.encode(transaction.get_id());
    if transaction.hash()? != transaction.get_id() {
        return Err(BlockchainError::InvalidTransaction(format!(
            "Transaction {txid_hex} does not match its contents"
        )));
    }
    if !transaction.is_coinbase() && transaction.get_vin().is_empty() {
        return Err(BlockchainError::InvalidTransaction(format!(
            "Transaction {txid_hex} has no inputs"
        )));
    }
    if transaction.get_vout().is_empty() {
        return Err(BlockchainError::InvalidTransaction(format!(
            "Transaction {txid_hex} has no outputs"
        )));
    }
    Ok(())
}

#[derive(Clone)]
pub struct Blockchain {
    tip_hash: Arc<RwLock<Vec<u8>>>,
    // held across tip read, proof-of-work and the store write
    append_lock: Arc<Mutex<()>>,
    store: BlockStore,
    mining: MiningSettings,
    db_path: PathBuf,
}

impl Blockchain {
    /// Create a chain at the configured location with a genesis block paying
    /// `genesis_address`
    pub fn create_blockchain(genesis_address: &str, settings: &Settings) -> Result<Blockchain> {
        Self::create_blockchain_with_mining(genesis_address, &settings.data_dir, settings.mining)
    }

    /// Open the chain at the configured location
    pub fn open_blockchain(settings: &Settings) -> Result<Blockchain> {
        Self::open_blockchain_with_mining(&settings.data_dir, settings.mining)
    }

    pub fn create_blockchain_with_path(genesis_address: &str, db_path: &Path) -> Result<Blockchain> {
        Self::create_blockchain_with_mining(genesis_address, db_path, MiningSettings::default())
    }

    pub fn open_blockchain_with_path(db_path: &Path) -> Result<Blockchain> {
        Self::open_blockchain_with_mining(db_path, MiningSettings::default())
    }

    pub fn create_blockchain_with_mining(
        genesis_address: &str,
        db_path: &Path,
        mining: MiningSettings,
    ) -> Result<Blockchain> {
        if !validate_address(genesis_address) {
            return Err(BlockchainError::InvalidAddress(genesis_address.to_string()));
        }

        let store = BlockStore::open(db_path)?;
        if store.get_tip_hash()?.is_some() {
            return Err(BlockchainError::ChainAlreadyExists(
                db_path.display().to_string(),
            ));
        }

        info!("Creating genesis block for address: {genesis_address}");
        let coinbase_tx = Transaction::new_coinbase_tx(genesis_address, GENESIS_COINBASE_DATA)?;
        let genesis = Block::generate_genesis_block(&coinbase_tx, &mining)?;
        store.put_block_and_tip(&genesis)?;
        info!("Genesis block {} stored", HEXLOWER.encode(genesis.get_hash()));

        Ok(Blockchain {
            tip_hash: Arc::new(RwLock::new(genesis.get_hash().to_vec())),
            append_lock: Arc::new(Mutex::new(())),
            store,
            mining,
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn open_blockchain_with_mining(db_path: &Path, mining: MiningSettings) -> Result<Blockchain> {
        let store = BlockStore::open(db_path)?;
        let tip_hash = store.get_tip_hash()?.ok_or_else(|| {
            BlockchainError::ChainNotFound(format!(
                "{} (create one first)",
                db_path.display()
            ))
        })?;

        Ok(Blockchain {
            tip_hash: Arc::new(RwLock::new(tip_hash)),
            append_lock: Arc::new(Mutex::new(())),
            store,
            mining,
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn get_tip_hash(&self) -> Result<Vec<u8>> {
        let tip_hash = self
            .tip_hash
            .read()
            .map_err(|_| BlockchainError::Database("Tip hash lock poisoned".to_string()))?;
        Ok(tip_hash.clone())
    }

    fn set_tip_hash(&self, new_tip_hash: &[u8]) -> Result<()> {
        let mut tip_hash = self
            .tip_hash
            .write()
            .map_err(|_| BlockchainError::Database("Tip hash lock poisoned".to_string()))?;
        *tip_hash = new_tip_hash.to_vec();
        Ok(())
    }

    /// Seal `transactions` into a new block on top of the current tip.
    ///
    /// Either the block is stored and becomes the tip, or nothing changes.
    pub fn mine_block(&self, transactions: &[Transaction]) -> Result<Block> {
        let _guard = self
            .append_lock
            .lock()
            .map_err(|_| BlockchainError::Database("Append lock poisoned".to_string()))?;

        self.check_block_transactions(transactions)?;

        let tip_hash = self.store.get_tip_hash()?.ok_or_else(|| {
            BlockchainError::ChainNotFound(self.db_path.display().to_string())
        })?;

        info!(
            "Mining block on top of {} with {} transactions",
            HEXLOWER.encode(&tip_hash),
            transactions.len()
        );
        let block = Block::new_block(&tip_hash, transactions, &self.mining)?;
        self.store.put_block_and_tip(&block)?;
        self.set_tip_hash(block.get_hash())?;
        info!("Successfully mined block: {}", HEXLOWER.encode(block.get_hash()));

        Ok(block)
    }

    // Structure, ids, signatures and double spends, checked before any mining work
    fn check_block_transactions(&self, transactions: &[Transaction]) -> Result<()> {
        if transactions.is_empty() {
            return Err(BlockchainError::InvalidBlock(
                "Block must contain at least one transaction".to_string(),
            ));
        }

        for (i, transaction) in transactions.iter().enumerate() {
            if transaction.is_coinbase() && i != 0 {
                return Err(BlockchainError::InvalidBlock(format!(
                    "Coinbase transaction at index {i}; only the first transaction may be coinbase"
                )));
            }
            check_transaction_shape(transaction)?;
        }

        let ChainIndex {
            mut known_ids,
            spent: spent_on_chain,
        } = self.chain_index()?;
        let mut spent_in_block: HashSet<OutPoint> = HashSet::new();

        for (i, transaction) in transactions.iter().enumerate() {
            let txid_hex = HEXLOWER.encode(transaction.get_id());
            if !known_ids.insert(transaction.get_id().to_vec()) {
                return Err(BlockchainError::InvalidTransaction(format!(
                    "Transaction {txid_hex} already exists"
                )));
            }
            if transaction.is_coinbase() {
                continue;
            }

            let prev_txs = self.find_prev_transactions(transaction, &transactions[..i])?;
            if !transaction.verify(&prev_txs)? {
                return Err(BlockchainError::InvalidTransaction(format!(
                    "Signature verification failed for transaction {txid_hex}"
                )));
            }

            for input in transaction.get_vin() {
                let index = input.output_index().ok_or_else(|| {
                    BlockchainError::InvalidTransaction(format!(
                        "Transaction {txid_hex} has a negative output index"
                    ))
                })?;
                let out_point = (input.get_txid().to_vec(), index);
                let out_point_hex = format!("{}:{index}", HEXLOWER.encode(input.get_txid()));

                if spent_on_chain.contains(&out_point) {
                    return Err(BlockchainError::InvalidTransaction(format!(
                        "Transaction {txid_hex} spends {out_point_hex}, which is already spent"
                    )));
                }
                if !spent_in_block.insert(out_point) {
                    return Err(BlockchainError::InvalidTransaction(format!(
                        "Double-spending detected in transaction {txid_hex}: {out_point_hex} already spent in this block"
                    )));
                }
            }
        }
        Ok(())
    }

    // Every transaction id on the chain and every output consumed by an input
    fn chain_index(&self) -> Result<ChainIndex> {
        let mut index = ChainIndex::default();
        for block in self.iterator()? {
            for transaction in block?.get_transactions() {
                index.known_ids.insert(transaction.get_id().to_vec());
                if transaction.is_coinbase() {
                    continue;
                }
                for input in transaction.get_vin() {
                    if let Some(out) = input.output_index() {
                        index.spent.insert((input.get_txid().to_vec(), out));
                    }
                }
            }
        }
        debug!(
            "{} transactions on chain, {} outputs spent",
            index.known_ids.len(),
            index.spent.len()
        );
        Ok(index)
    }

    /// Lazy newest-to-oldest walk starting at the current tip
    pub fn iterator(&self) -> Result<BlockchainIterator> {
        Ok(BlockchainIterator::new(
            self.get_tip_hash()?,
            self.store.clone(),
        ))
    }

    /// Every block, newest first
    pub fn blocks(&self) -> Result<Vec<Block>> {
        self.iterator()?.collect()
    }

    /// Linear scan for the transaction with `txid`
    pub fn find_transaction(&self, txid: &[u8]) -> Result<Transaction> {
        for block in self.iterator()? {
            let block = block?;
            if let Some(transaction) = block
                .get_transactions()
                .iter()
                .find(|transaction| transaction.get_id() == txid)
            {
                return Ok(transaction.clone());
            }
        }
        Err(BlockchainError::TransactionNotFound(HEXLOWER.encode(txid)))
    }

    // Resolve the transactions `transaction` spends from, looking at
    // `pending` (earlier transactions of the block being built) before the chain
    fn find_prev_transactions(
        &self,
        transaction: &Transaction,
        pending: &[Transaction],
    ) -> Result<PrevTransactions> {
        let mut prev_txs = PrevTransactions::new();
        if transaction.is_coinbase() {
            return Ok(prev_txs);
        }
        for input in transaction.get_vin() {
            if prev_txs.contains_key(input.get_txid()) {
                continue;
            }
            let prev_tx = match pending.iter().find(|tx| tx.get_id() == input.get_txid()) {
                Some(tx) => tx.clone(),
                None => self.find_transaction(input.get_txid())?,
            };
            prev_txs.insert(prev_tx.get_id().to_vec(), prev_tx);
        }
        Ok(prev_txs)
    }

    /// Sign every input of `transaction`, resolving spent outputs on-chain
    pub fn sign_transaction(&self, transaction: &mut Transaction, pkcs8: &[u8]) -> Result<()> {
        let prev_txs = self.find_prev_transactions(transaction, &[])?;
        transaction.sign(pkcs8, &prev_txs)
    }

    pub fn verify_transaction(&self, transaction: &Transaction) -> Result<bool> {
        let prev_txs = self.find_prev_transactions(transaction, &[])?;
        transaction.verify(&prev_txs)
    }
}

/// Walks `prev_hash` links from a starting hash down to genesis.
///
/// A hash that cannot be resolved yields a corruption error and ends the walk.
pub struct BlockchainIterator {
    store: BlockStore,
    current_hash: Option<Vec<u8>>,
}

impl BlockchainIterator {
    fn new(tip_hash: Vec<u8>, store: BlockStore) -> BlockchainIterator {
        BlockchainIterator {
            store,
            current_hash: Some(tip_hash),
        }
    }
}

impl Iterator for BlockchainIterator {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        let current_hash = self.current_hash.take()?;
        match self.store.get_block(&current_hash) {
            Ok(Some(block)) => {
                if !block.is_genesis() {
                    self.current_hash = Some(block.get_pre_block_hash().to_vec());
                }
                Some(Ok(block))
            }
            Ok(None) => Some(Err(BlockchainError::Corruption(format!(
                "Block {} is referenced but missing",
                HEXLOWER.encode(&current_hash)
            )))),
            Err(e) => Some(Err(e)),
        }
    }
}
