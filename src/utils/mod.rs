//! Utility functions and helpers
//!
//! Hashing, base58, ECDSA helpers and the bincode wrapper used for
//! everything that is persisted.

pub mod crypto;
pub mod serialization;

pub use crypto::{
    base58_decode, base58_encode, ecdsa_p256_sha256_sign_digest, ecdsa_p256_sha256_sign_verify,
    new_key_pair, raw_public_key, ripemd160_digest, sha256_digest, P256_FIELD_LEN,
};

pub use serialization::{deserialize, serialize};
