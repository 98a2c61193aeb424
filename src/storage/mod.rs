//! Data storage and persistence
//!
//! Blocks live in a `sled` tree keyed by block hash, next to a single tip
//! key. Nothing is ever overwritten except the tip. Unspent outputs are not
//! indexed; `UTXOSet` derives them from the chain on demand.

pub mod block_store;
pub mod utxo_set;

pub use block_store::{BlockStore, TIP_BLOCK_HASH_KEY};
pub use utxo_set::{SpendableOutputs, UTXOSet};
