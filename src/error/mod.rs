//! Error handling for the ledger
//!
//! Every fallible operation returns [`Result`]. Nothing in the library aborts
//! the process; the CLI is the only place an error turns into an exit code.

use std::fmt;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, BlockchainError>;

/// Coarse classification used by callers that only care about the category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A chain entry, prior transaction or wallet could not be found
    NotFound,
    /// Input was rejected: bad address, insufficient funds, unmet target
    Validation,
    /// Stored data is malformed or the hash link is broken
    Corruption,
    /// Storage, I/O, cryptography or configuration failure
    Internal,
}

#[derive(Debug, Clone)]
pub enum BlockchainError {
    /// No chain exists at the requested location
    ChainNotFound(String),
    /// A chain already exists at the requested location
    ChainAlreadyExists(String),
    /// A referenced transaction id could not be resolved
    TransactionNotFound(String),
    /// No keypair is stored for the given address
    WalletNotFound(String),
    /// Invalid address format or checksum
    InvalidAddress(String),
    /// Insufficient funds for transaction
    InsufficientFunds { required: u64, available: u64 },
    /// Transaction rejected by structural or signature checks
    InvalidTransaction(String),
    /// Block rejected before it was mined
    InvalidBlock(String),
    /// Nonce search failed to meet the target
    Mining(String),
    /// Stored bytes could not be interpreted or the chain link is broken
    Corruption(String),
    /// Database-related errors
    Database(String),
    /// Cryptographic operation errors
    Crypto(String),
    /// Serialization/deserialization errors
    Serialization(String),
    /// Configuration errors
    Config(String),
    /// File I/O errors
    Io(String),
}

impl BlockchainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BlockchainError::ChainNotFound(_)
            | BlockchainError::TransactionNotFound(_)
            | BlockchainError::WalletNotFound(_) => ErrorKind::NotFound,
            BlockchainError::ChainAlreadyExists(_)
            | BlockchainError::InvalidAddress(_)
            | BlockchainError::InsufficientFunds { .. }
            | BlockchainError::InvalidTransaction(_)
            | BlockchainError::InvalidBlock(_)
            | BlockchainError::Mining(_) => ErrorKind::Validation,
            BlockchainError::Corruption(_) => ErrorKind::Corruption,
            BlockchainError::Database(_)
            | BlockchainError::Crypto(_)
            | BlockchainError::Serialization(_)
            | BlockchainError::Config(_)
            | BlockchainError::Io(_) => ErrorKind::Internal,
        }
    }
}

impl fmt::Display for BlockchainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockchainError::ChainNotFound(msg) => write!(f, "No blockchain found: {msg}"),
            BlockchainError::ChainAlreadyExists(msg) => {
                write!(f, "Blockchain already exists: {msg}")
            }
            BlockchainError::TransactionNotFound(id) => {
                write!(f, "Previous transaction not found: {id}")
            }
            BlockchainError::WalletNotFound(addr) => write!(f, "Wallet not found: {addr}"),
            BlockchainError::InvalidAddress(addr) => write!(f, "Invalid address: {addr}"),
            BlockchainError::InsufficientFunds {
                required,
                available,
            } => {
                write!(
                    f,
                    "Insufficient funds: required {required}, available {available}"
                )
            }
            BlockchainError::InvalidTransaction(msg) => write!(f, "Invalid transaction: {msg}"),
            BlockchainError::InvalidBlock(msg) => write!(f, "Invalid block: {msg}"),
            BlockchainError::Mining(msg) => write!(f, "Mining error: {msg}"),
            BlockchainError::Corruption(msg) => write!(f, "Chain corruption: {msg}"),
            BlockchainError::Database(msg) => write!(f, "Database error: {msg}"),
            BlockchainError::Crypto(msg) => write!(f, "Cryptographic error: {msg}"),
            BlockchainError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            BlockchainError::Config(msg) => write!(f, "Configuration error: {msg}"),
            BlockchainError::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for BlockchainError {}

impl From<std::io::Error> for BlockchainError {
    fn from(err: std::io::Error) -> Self {
        BlockchainError::Io(err.to_string())
    }
}

impl From<sled::Error> for BlockchainError {
    fn from(err: sled::Error) -> Self {
        BlockchainError::Database(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for BlockchainError {
    fn from(err: bincode::error::EncodeError) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for BlockchainError {
    fn from(err: bincode::error::DecodeError) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}
