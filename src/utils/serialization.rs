// Every persisted structure (blocks, the keyring) and every transaction hash
// goes through these two functions, so the encoding must stay fixed.
use crate::error::{BlockchainError, Result};

/// Encode with bincode's standard configuration
pub fn serialize<T: bincode::Encode>(data: &T) -> Result<Vec<u8>> {
    let config = bincode::config::standard();
    Ok(bincode::encode_to_vec(data, config)?)
}

/// Decode with bincode's standard configuration; trailing bytes are rejected
pub fn deserialize<T: bincode::Decode<()>>(bytes: &[u8]) -> Result<T> {
    let config = bincode::config::standard();
    let (data, read) = bincode::decode_from_slice(bytes, config)?;
    if read != bytes.len() {
        return Err(BlockchainError::Serialization(format!(
            "Deserialization left {} trailing bytes",
            bytes.len() - read
        )));
    }
    Ok(data)
}
