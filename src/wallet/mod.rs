//! Key management and address derivation
//!
//! A wallet is a P-256 keypair; its address is the base58 encoding of
//! version, pub key hash and checksum. `Wallets` is the on-disk keyring.

#[allow(clippy::module_inception)]
pub mod wallet;
pub mod wallets;

pub use wallet::{
    address_to_pub_key_hash, convert_address, hash_pub_key, validate_address, Wallet,
    ADDRESS_CHECK_SUM_LEN, PUB_KEY_HASH_LEN,
};
pub use wallets::{Wallets, WALLET_FILE};
