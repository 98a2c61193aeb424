//! Core ledger functionality
//!
//! Blocks, transactions and their signatures, proof-of-work sealing, and the
//! append-only chain that ties them together.

pub mod block;
pub mod blockchain;
pub mod proof_of_work;
pub mod signature;
pub mod transaction;

pub use block::Block;
pub use blockchain::{Blockchain, BlockchainIterator, GENESIS_COINBASE_DATA};
pub use proof_of_work::{ProofOfWork, DIFFICULTY};
pub use signature::{digest_for_input, PrevTransactions};
pub use transaction::{TXInput, TXOutput, Transaction, COINBASE_OUT_INDEX, SUBSIDY};
