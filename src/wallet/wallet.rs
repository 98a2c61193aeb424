use crate::error::{BlockchainError, Result};
use crate::utils::{base58_decode, base58_encode, ripemd160_digest, sha256_digest};
use zeroize::{Zeroize, ZeroizeOnDrop};

const VERSION: u8 = 0x00;
pub const ADDRESS_CHECK_SUM_LEN: usize = 4;
pub const PUB_KEY_HASH_LEN: usize = 20;

// version + pub_key_hash + checksum
const ADDRESS_PAYLOAD_LEN: usize = 1 + PUB_KEY_HASH_LEN + ADDRESS_CHECK_SUM_LEN;

/// A P-256 keypair. The private half stays PKCS#8 encoded and is wiped on drop.
#[derive(Clone, bincode::Encode, bincode::Decode, Zeroize, ZeroizeOnDrop)]
pub struct Wallet {
    pkcs8: Vec<u8>,
    public_key: Vec<u8>,
}

impl Wallet {
    pub fn new() -> Result<Wallet> {
        let pkcs8 = crate::utils::new_key_pair()?;
        let public_key = crate::utils::raw_public_key(&pkcs8)?;
        Ok(Wallet { pkcs8, public_key })
    }

    pub fn get_address(&self) -> String {
        let pub_key_hash = hash_pub_key(self.public_key.as_slice());
        convert_address(pub_key_hash.as_slice())
    }

    /// Raw `X || Y` public key as carried by transaction inputs
    pub fn get_public_key(&self) -> &[u8] {
        self.public_key.as_slice()
    }

    pub fn get_pkcs8(&self) -> &[u8] {
        self.pkcs8.as_slice()
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.get_address())
            .finish_non_exhaustive()
    }
}

/// RIPEMD160(SHA256(pub_key))
pub fn hash_pub_key(pub_key: &[u8]) -> Vec<u8> {
    let pub_key_sha256 = sha256_digest(pub_key);
    ripemd160_digest(pub_key_sha256.as_slice())
}

fn checksum(payload: &[u8]) -> Vec<u8> {
    let first_sha = sha256_digest(payload);
    let second_sha = sha256_digest(first_sha.as_slice());
    second_sha[0..ADDRESS_CHECK_SUM_LEN].to_vec()
}

pub fn validate_address(address: &str) -> bool {
    address_to_pub_key_hash(address).is_ok()
}

/// Decode an address back into the pub key hash it encodes, checking length
/// and checksum on the way.
pub fn address_to_pub_key_hash(address: &str) -> Result<Vec<u8>> {
    let payload = base58_decode(address)?;
    if payload.len() != ADDRESS_PAYLOAD_LEN {
        return Err(BlockchainError::InvalidAddress(format!(
            "{address}: expected {ADDRESS_PAYLOAD_LEN} bytes, got {}",
            payload.len()
        )));
    }

    let (versioned_hash, actual_checksum) = payload.split_at(1 + PUB_KEY_HASH_LEN);
    if checksum(versioned_hash) != actual_checksum {
        return Err(BlockchainError::InvalidAddress(format!(
            "{address}: checksum mismatch"
        )));
    }
    Ok(versioned_hash[1..].to_vec())
}

pub fn convert_address(pub_key_hash: &[u8]) -> String {
    let mut payload: Vec<u8> = vec![];
    payload.push(VERSION);
    payload.extend(pub_key_hash);
    let checksum = checksum(payload.as_slice());
    payload.extend(checksum.as_slice());
    base58_encode(payload.as_slice())
}
