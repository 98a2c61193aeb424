use ring::digest::{Context, SHA256};
use ring::rand::SystemRandom;
use ring::signature::{
    EcdsaKeyPair, KeyPair, ECDSA_P256_SHA256_FIXED, ECDSA_P256_SHA256_FIXED_SIGNING,
};
use ripemd::{Digest as RipemdDigest, Ripemd160};

use crate::error::{BlockchainError, Result};

/// Width of one P-256 scalar or coordinate in bytes
pub const P256_FIELD_LEN: usize = 32;

// SEC1 tag for an uncompressed point
const UNCOMPRESSED_POINT_TAG: u8 = 0x04;

pub fn sha256_digest(data: &[u8]) -> Vec<u8> {
    let mut context = Context::new(&SHA256);
    context.update(data);
    let digest = context.finish();
    digest.as_ref().to_vec()
}

pub fn ripemd160_digest(data: &[u8]) -> Vec<u8> {
    let mut hasher = Ripemd160::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

pub fn base58_encode(data: &[u8]) -> String {
    bs58::encode(data).into_string()
}

pub fn base58_decode(data: &str) -> Result<Vec<u8>> {
    bs58::decode(data)
        .into_vec()
        .map_err(|e| BlockchainError::InvalidAddress(format!("Invalid base58 encoding: {e}")))
}

/// Generate a fresh P-256 key pair, returned as PKCS#8 bytes
pub fn new_key_pair() -> Result<Vec<u8>> {
    let rng = SystemRandom::new();
    let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, &rng)
        .map_err(|e| BlockchainError::Crypto(format!("Failed to generate ECDSA key pair: {e}")))?
        .as_ref()
        .to_vec();
    Ok(pkcs8)
}

/// Raw `X || Y` public key (64 bytes, no SEC1 tag) for a PKCS#8 private key
pub fn raw_public_key(pkcs8: &[u8]) -> Result<Vec<u8>> {
    let rng = SystemRandom::new();
    let key_pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8, &rng)
        .map_err(|e| {
            BlockchainError::Crypto(format!("Failed to create key pair from PKCS8: {e}"))
        })?;
    let point = key_pair.public_key().as_ref();
    match point.split_first() {
        Some((&UNCOMPRESSED_POINT_TAG, coordinates)) => Ok(coordinates.to_vec()),
        _ => Err(BlockchainError::Crypto(
            "Public key is not an uncompressed point".to_string(),
        )),
    }
}

/// Sign `message` and return `r || s` as two fixed-width big-endian halves
pub fn ecdsa_p256_sha256_sign_digest(pkcs8: &[u8], message: &[u8]) -> Result<Vec<u8>> {
    let rng = SystemRandom::new();
    let key_pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8, &rng)
        .map_err(|e| {
            BlockchainError::Crypto(format!("Failed to create key pair from PKCS8: {e}"))
        })?;
    let signature = key_pair
        .sign(&rng, message)
        .map_err(|e| BlockchainError::Crypto(format!("Failed to sign message: {e}")))?
        .as_ref()
        .to_vec();
    Ok(signature)
}

/// Verify an `r || s` signature against a raw `X || Y` public key.
///
/// Both byte strings are split into two equal halves. Halves shorter than a
/// field element are left-padded, so minimal-width big-endian encodings are
/// accepted as well as fixed-width ones.
pub fn ecdsa_p256_sha256_sign_verify(public_key: &[u8], signature: &[u8], message: &[u8]) -> bool {
    let (x, y) = match split_halves(public_key) {
        Some(halves) => halves,
        None => return false,
    };
    let (r, s) = match split_halves(signature) {
        Some(halves) => halves,
        None => return false,
    };

    let mut point = Vec::with_capacity(1 + 2 * P256_FIELD_LEN);
    point.push(UNCOMPRESSED_POINT_TAG);
    point.extend(x);
    point.extend(y);

    let mut fixed_signature = Vec::with_capacity(2 * P256_FIELD_LEN);
    fixed_signature.extend(r);
    fixed_signature.extend(s);

    let peer_public_key = ring::signature::UnparsedPublicKey::new(&ECDSA_P256_SHA256_FIXED, point);
    peer_public_key
        .verify(message, fixed_signature.as_slice())
        .is_ok()
}

fn split_halves(data: &[u8]) -> Option<(Vec<u8>, Vec<u8>)> {
    if data.is_empty() || data.len() % 2 != 0 || data.len() > 2 * P256_FIELD_LEN {
        return None;
    }
    let (left, right) = data.split_at(data.len() / 2);
    Some((left_pad(left), left_pad(right)))
}

fn left_pad(half: &[u8]) -> Vec<u8> {
    let mut padded = vec![0u8; P256_FIELD_LEN - half.len()];
    padded.extend_from_slice(half);
    padded
}
