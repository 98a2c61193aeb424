use crate::core::{Block, Transaction};
use crate::error::{BlockchainError, Result};
use crate::utils::sha256_digest;
use data_encoding::HEXLOWER;
use log::debug;
use num_bigint::{BigInt, Sign};
use std::ops::ShlAssign;
use std::sync::atomic::{AtomicI64, Ordering};
use std::thread;

/// Leading zero bits a block digest needs. Fixed; there is no retargeting.
pub const DIFFICULTY: u32 = 12;

pub const MAX_NONCE: i64 = i64::MAX;

pub struct ProofOfWork {
    tx_hash: Vec<u8>,
    prev_hash: Vec<u8>,
    target: BigInt,
}

impl ProofOfWork {
    pub fn new(transactions: &[Transaction], prev_hash: &[u8]) -> ProofOfWork {
        let mut target = BigInt::from(1);
        target.shl_assign(256 - DIFFICULTY);
        ProofOfWork {
            tx_hash: hash_transactions(transactions),
            prev_hash: prev_hash.to_vec(),
            target,
        }
    }

    pub fn for_block(block: &Block) -> ProofOfWork {
        Self::new(block.get_transactions(), block.get_pre_block_hash())
    }

    /// Recompute the digest of a sealed block and check it against the target
    pub fn validate(block: &Block) -> bool {
        let pow = ProofOfWork::for_block(block);
        let hash = sha256_digest(pow.prepare_data(block.get_nonce()).as_slice());
        pow.meets_target(&hash)
    }

    fn meets_target(&self, hash: &[u8]) -> bool {
        BigInt::from_bytes_be(Sign::Plus, hash) < self.target
    }

    fn prepare_data(&self, nonce: i64) -> Vec<u8> {
        let mut data_bytes = vec![];
        data_bytes.extend(self.tx_hash.as_slice());
        data_bytes.extend(self.prev_hash.as_slice());
        data_bytes.extend(i64::from(DIFFICULTY).to_be_bytes());
        data_bytes.extend(nonce.to_be_bytes());
        data_bytes
    }

    fn try_nonce(&self, nonce: i64) -> Option<Vec<u8>> {
        let hash = sha256_digest(self.prepare_data(nonce).as_slice());
        self.meets_target(&hash).then_some(hash)
    }

    pub fn run(&self) -> Result<(i64, Vec<u8>)> {
        self.run_with_budget(MAX_NONCE)
    }

    /// Search nonces `0..budget` in order and return the first one that works
    pub fn run_with_budget(&self, budget: i64) -> Result<(i64, Vec<u8>)> {
        for nonce in 0..budget {
            if let Some(hash) = self.try_nonce(nonce) {
                debug!("Found nonce {nonce}: {}", HEXLOWER.encode(&hash));
                return Ok((nonce, hash));
            }
        }
        Err(self.exhausted(budget))
    }

    /// Split `0..budget` over `workers` threads, each taking every
    /// `workers`-th nonce. The result is the lowest valid nonce, the same one
    /// `run_with_budget` finds.
    pub fn run_parallel(&self, workers: usize, budget: i64) -> Result<(i64, Vec<u8>)> {
        if workers <= 1 {
            return self.run_with_budget(budget);
        }
        let stride = i64::try_from(workers)
            .map_err(|_| BlockchainError::Mining(format!("Too many workers: {workers}")))?;
        let best = AtomicI64::new(i64::MAX);

        thread::scope(|scope| {
            for worker in 0..stride {
                let best = &best;
                scope.spawn(move || {
                    let mut nonce = worker;
                    while nonce < budget && nonce < best.load(Ordering::Relaxed) {
                        if self.try_nonce(nonce).is_some() {
                            best.fetch_min(nonce, Ordering::Relaxed);
                            break;
                        }
                        nonce = match nonce.checked_add(stride) {
                            Some(next) => next,
                            None => break,
                        };
                    }
                });
            }
        });

        let nonce = best.into_inner();
        if nonce == i64::MAX {
            return Err(self.exhausted(budget));
        }
        let hash = sha256_digest(self.prepare_data(nonce).as_slice());
        debug!(
            "Found nonce {nonce} with {workers} workers: {}",
            HEXLOWER.encode(&hash)
        );
        Ok((nonce, hash))
    }

    fn exhausted(&self, budget: i64) -> BlockchainError {
        BlockchainError::Mining(format!(
            "No nonce below {budget} meets the {DIFFICULTY}-bit target"
        ))
    }
}

/// SHA-256 over the concatenated ids of `transactions`, in order
pub fn hash_transactions(transactions: &[Transaction]) -> Vec<u8> {
    let mut txhashs = vec![];
    for transaction in transactions {
        txhashs.extend(transaction.get_id());
    }
    sha256_digest(txhashs.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_ADDRESS: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";

    fn coinbase(data: &str) -> Transaction {
        Transaction::new_coinbase_tx(TEST_ADDRESS, data).unwrap()
    }

    #[test]
    fn test_target_is_two_to_the_remaining_bits() {
        let pow = ProofOfWork::new(&[coinbase("a")], &[]);
        let mut expected = BigInt::from(1);
        expected.shl_assign(256 - DIFFICULTY);
        assert_eq!(pow.target, expected);
    }

    #[test]
    fn test_run_finds_hash_below_target() {
        let pow = ProofOfWork::new(&[coinbase("run")], &[1u8; 32]);
        let (nonce, hash) = pow.run().unwrap();
        assert!(nonce >= 0);
        assert_eq!(hash.len(), 32);
        assert!(pow.meets_target(&hash));
        assert_eq!(sha256_digest(&pow.prepare_data(nonce)), hash);
    }

    #[test]
    fn test_run_returns_first_valid_nonce() {
        let pow = ProofOfWork::new(&[coinbase("first")], &[]);
        let (nonce, _) = pow.run().unwrap();
        assert!((0..nonce).all(|n| pow.try_nonce(n).is_none()));
    }

    #[test]
    fn test_exhausted_budget_is_an_error() {
        let pow = ProofOfWork::new(&[coinbase("budget")], &[]);
        let (nonce, _) = pow.run().unwrap();
        let err = pow.run_with_budget(nonce).unwrap_err();
        assert!(matches!(err, BlockchainError::Mining(_)));
        assert!(pow.run_with_budget(0).is_err());
    }

    #[test]
    fn test_parallel_search_matches_sequential() {
        let pow = ProofOfWork::new(&[coinbase("parallel")], &[7u8; 32]);
        let sequential = pow.run().unwrap();
        assert_eq!(pow.run_parallel(4, MAX_NONCE).unwrap(), sequential);
        assert_eq!(pow.run_parallel(1, MAX_NONCE).unwrap(), sequential);
    }

    #[test]
    fn test_parallel_search_respects_budget() {
        let pow = ProofOfWork::new(&[coinbase("parallel budget")], &[]);
        let (nonce, _) = pow.run().unwrap();
        assert!(pow.run_parallel(3, nonce).is_err());
        assert_eq!(pow.run_parallel(3, nonce + 1).unwrap().0, nonce);
    }

    #[test]
    fn test_prepare_data_layout() {
        let prev_hash = [9u8; 32];
        let pow = ProofOfWork::new(&[coinbase("layout")], &prev_hash);
        let data = pow.prepare_data(0x0102);

        assert_eq!(data.len(), 32 + 32 + 8 + 8);
        assert_eq!(&data[..32], pow.tx_hash.as_slice());
        assert_eq!(&data[32..64], &prev_hash);
        assert_eq!(&data[64..72], &i64::from(DIFFICULTY).to_be_bytes());
        assert_eq!(&data[72..], &0x0102i64.to_be_bytes());
    }

    #[test]
    fn test_hash_transactions_depends_on_order() {
        let a = coinbase("a");
        let b = coinbase("b");
        assert_ne!(
            hash_transactions(&[a.clone(), b.clone()]),
            hash_transactions(&[b, a])
        );
    }
}
