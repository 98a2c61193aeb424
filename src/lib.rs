//! # Tally Chain
//!
//! A single-node, append-only ledger. Blocks are sealed by proof-of-work and
//! linked by hash; value moves as unspent transaction outputs locked to the
//! hash of a P-256 public key.
//!
//! ## Layout
//! - `core/`: blocks, transactions, signing, proof-of-work and the chain
//! - `storage/`: the `sled` block store and the chain-scanning UTXO view
//! - `wallet/`: key pairs, address derivation and the keyring file
//! - `config/`: settings from `ledger.toml` and the environment
//! - `utils/`: hashing, ECDSA, base58 and bincode helpers
//! - `cli/`: argument parsing for the binary
//!
//! Balances are never cached. Every query walks the chain from the tip back to
//! genesis, so cost grows with chain length.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod storage;
pub mod utils;
pub mod wallet;

pub use cli::{Command, Opt};
pub use config::{MiningSettings, Settings};
pub use core::{
    Block, Blockchain, BlockchainIterator, ProofOfWork, TXInput, TXOutput, Transaction,
    DIFFICULTY, SUBSIDY,
};
pub use error::{BlockchainError, ErrorKind, Result};
pub use storage::{BlockStore, UTXOSet};
pub use utils::{
    base58_decode, base58_encode, ecdsa_p256_sha256_sign_digest, ecdsa_p256_sha256_sign_verify,
    new_key_pair, ripemd160_digest, sha256_digest,
};
pub use wallet::{
    address_to_pub_key_hash, convert_address, hash_pub_key, validate_address, Wallet, Wallets,
    ADDRESS_CHECK_SUM_LEN,
};
