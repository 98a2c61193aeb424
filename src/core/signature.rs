//! Per-input signing and verification
//!
//! Each input signs its own digest: the transaction with every signature and
//! public key cleared, except that the input being signed carries the pub key
//! hash of the output it spends. Verification recomputes the same digest.

use crate::core::{TXInput, TXOutput, Transaction};
use crate::error::{BlockchainError, Result};
use crate::utils::{ecdsa_p256_sha256_sign_digest, ecdsa_p256_sha256_sign_verify};
use data_encoding::HEXLOWER;
use log::debug;
use std::collections::BTreeMap;

/// Prior transactions keyed by their id
pub type PrevTransactions = BTreeMap<Vec<u8>, Transaction>;

/// Message digest signed by input `input_index` of `tx`.
pub fn digest_for_input(
    tx: &Transaction,
    input_index: usize,
    prev_pub_key_hash: &[u8],
) -> Result<Vec<u8>> {
    let mut trimmed = tx.trimmed_copy();
    let input = trimmed.vin_mut().get_mut(input_index).ok_or_else(|| {
        BlockchainError::InvalidTransaction(format!("Input index {input_index} out of range"))
    })?;
    input.set_pub_key(prev_pub_key_hash.to_vec());
    trimmed.hash()
}

// Every input must reference a known transaction before anything else happens
fn ensure_prev_transactions(tx: &Transaction, prev_txs: &PrevTransactions) -> Result<()> {
    for input in tx.get_vin() {
        if !prev_txs.contains_key(input.get_txid()) {
            return Err(BlockchainError::TransactionNotFound(
                HEXLOWER.encode(input.get_txid()),
            ));
        }
    }
    Ok(())
}

fn referenced_output<'a>(
    input: &TXInput,
    prev_txs: &'a PrevTransactions,
) -> Result<&'a TXOutput> {
    let prev_tx = prev_txs
        .get(input.get_txid())
        .ok_or_else(|| BlockchainError::TransactionNotFound(HEXLOWER.encode(input.get_txid())))?;
    input
        .output_index()
        .and_then(|index| prev_tx.get_vout().get(index))
        .ok_or_else(|| {
            BlockchainError::InvalidTransaction(format!(
                "Output {} does not exist in transaction {}",
                input.get_vout(),
                HEXLOWER.encode(input.get_txid())
            ))
        })
}

impl Transaction {
    /// Sign every input with `pkcs8`. Coinbase transactions are left as is.
    ///
    /// All digests are computed before any signature is written, so a
    /// failure leaves the transaction untouched.
    pub fn sign(&mut self, pkcs8: &[u8], prev_txs: &PrevTransactions) -> Result<()> {
        if self.is_coinbase() {
            return Ok(());
        }
        ensure_prev_transactions(self, prev_txs)?;

        let mut digests = Vec::with_capacity(self.get_vin().len());
        for (idx, input) in self.get_vin().iter().enumerate() {
            let prev_output = referenced_output(input, prev_txs)?;
            digests.push(digest_for_input(self, idx, prev_output.get_pub_key_hash())?);
        }

        let mut signatures = Vec::with_capacity(digests.len());
        for digest in &digests {
            signatures.push(ecdsa_p256_sha256_sign_digest(pkcs8, digest)?);
        }

        for (input, signature) in self.vin_mut().iter_mut().zip(signatures) {
            input.set_signature(signature);
        }
        Ok(())
    }

    /// Check every input's signature. Coinbase transactions always pass.
    ///
    /// A missing prior transaction is an error; a bad signature, a key that
    /// does not own the spent output or a dangling output index yields
    /// `Ok(false)`.
    pub fn verify(&self, prev_txs: &PrevTransactions) -> Result<bool> {
        if self.is_coinbase() {
            return Ok(true);
        }
        ensure_prev_transactions(self, prev_txs)?;

        for (idx, input) in self.get_vin().iter().enumerate() {
            let prev_output = match referenced_output(input, prev_txs) {
                Ok(output) => output,
                Err(BlockchainError::InvalidTransaction(msg)) => {
                    debug!("Input {idx} rejected: {msg}");
                    return Ok(false);
                }
                Err(e) => return Err(e),
            };

            if !input.uses_key(prev_output.get_pub_key_hash()) {
                debug!("Input {idx} carries a key that does not own the spent output");
                return Ok(false);
            }

            let digest = digest_for_input(self, idx, prev_output.get_pub_key_hash())?;
            if !ecdsa_p256_sha256_sign_verify(input.get_pub_key(), input.get_signature(), &digest)
            {
                debug!("Input {idx} signature does not verify");
                return Ok(false);
            }
        }
        Ok(true)
    }
}
