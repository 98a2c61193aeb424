use crate::core::{Blockchain, TXOutput, Transaction};
use crate::error::{BlockchainError, Result};
use log::debug;
use std::collections::{BTreeMap, BTreeSet};

/// txid -> output indices
pub type SpendableOutputs = BTreeMap<Vec<u8>, BTreeSet<usize>>;

/// Unspent output view for one pub key hash, rebuilt by scanning the chain on
/// every call. There is no persisted index.
pub struct UTXOSet {
    blockchain: Blockchain,
}

// A transaction together with the outputs in it that a key can still spend
struct UnspentTransaction {
    transaction: Transaction,
    outputs: Vec<usize>,
}

impl UTXOSet {
    pub fn new(blockchain: Blockchain) -> UTXOSet {
        UTXOSet { blockchain }
    }

    pub fn get_blockchain(&self) -> &Blockchain {
        &self.blockchain
    }

    // Walk newest to oldest. Spends inside a block are recorded before its
    // outputs are examined, so an output consumed in the same block is skipped.
    fn scan(&self, pub_key_hash: &[u8]) -> Result<Vec<UnspentTransaction>> {
        let mut spent: BTreeMap<Vec<u8>, BTreeSet<usize>> = BTreeMap::new();
        let mut unspent = vec![];

        for block in self.blockchain.iterator()? {
            let block = block?;

            for tx in block.get_transactions() {
                if tx.is_coinbase() {
                    continue;
                }
                for input in tx.get_vin() {
                    if !input.uses_key(pub_key_hash) {
                        continue;
                    }
                    if let Some(index) = input.output_index() {
                        spent
                            .entry(input.get_txid().to_vec())
                            .or_default()
                            .insert(index);
                    }
                }
            }

            for tx in block.get_transactions() {
                let spent_here = spent.get(tx.get_id());
                let outputs: Vec<usize> = tx
                    .get_vout()
                    .iter()
                    .enumerate()
                    .filter(|(idx, out)| {
                        out.is_locked_with_key(pub_key_hash)
                            && !spent_here.is_some_and(|indices| indices.contains(idx))
                    })
                    .map(|(idx, _)| idx)
                    .collect();

                if !outputs.is_empty() {
                    unspent.push(UnspentTransaction {
                        transaction: tx.clone(),
                        outputs,
                    });
                }
            }
        }
        Ok(unspent)
    }

    /// Transactions holding at least one output `pub_key_hash` can still spend,
    /// newest first, each listed once
    pub fn find_unspent_transactions(&self, pub_key_hash: &[u8]) -> Result<Vec<Transaction>> {
        Ok(self
            .scan(pub_key_hash)?
            .into_iter()
            .map(|unspent| unspent.transaction)
            .collect())
    }

    pub fn find_utxo(&self, pub_key_hash: &[u8]) -> Result<Vec<TXOutput>> {
        let mut utxos = vec![];
        for unspent in self.scan(pub_key_hash)? {
            for idx in unspent.outputs {
                utxos.push(unspent.transaction.get_vout()[idx].clone());
            }
        }
        Ok(utxos)
    }

    pub fn get_balance(&self, pub_key_hash: &[u8]) -> Result<u64> {
        self.find_utxo(pub_key_hash)?
            .iter()
            .try_fold(0u64, |balance, out| balance.checked_add(out.get_value()))
            .ok_or_else(|| BlockchainError::Corruption("Balance overflows u64".to_string()))
    }

    /// Greedily collect outputs, in walk order, until their sum reaches
    /// `amount`. Returns less than `amount` when the key cannot cover it.
    pub fn find_spendable_outputs(
        &self,
        pub_key_hash: &[u8],
        amount: u64,
    ) -> Result<(u64, SpendableOutputs)> {
        let mut unspent_outputs = SpendableOutputs::new();
        let mut accumulated: u64 = 0;

        'scan: for unspent in self.scan(pub_key_hash)? {
            for idx in unspent.outputs {
                if accumulated >= amount {
                    break 'scan;
                }
                let value = unspent.transaction.get_vout()[idx].get_value();
                accumulated = accumulated.checked_add(value).ok_or_else(|| {
                    BlockchainError::Corruption("Spendable amount overflows u64".to_string())
                })?;
                unspent_outputs
                    .entry(unspent.transaction.get_id().to_vec())
                    .or_default()
                    .insert(idx);
            }
        }

        debug!(
            "Selected {} outputs worth {accumulated} for amount {amount}",
            unspent_outputs.values().map(BTreeSet::len).sum::<usize>()
        );
        Ok((accumulated, unspent_outputs))
    }
}
