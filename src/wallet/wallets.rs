use crate::error::{BlockchainError, Result};
use crate::utils::{deserialize, serialize};
use crate::wallet::Wallet;
use log::{info, warn};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

pub const WALLET_FILE: &str = "wallet.dat";

/// Address -> keypair mapping backed by a single file.
///
/// A missing file is an empty keyring. Every mutation is written back
/// immediately.
pub struct Wallets {
    wallets: HashMap<String, Wallet>,
    path: PathBuf,
}

impl Wallets {
    pub fn load(path: impl AsRef<Path>) -> Result<Wallets> {
        let mut wallets = Wallets {
            wallets: HashMap::new(),
            path: path.as_ref().to_path_buf(),
        };
        wallets.load_from_file()?;
        Ok(wallets)
    }

    pub fn create_wallet(&mut self) -> Result<String> {
        let wallet = Wallet::new()?;
        let address = wallet.get_address();
        self.wallets.insert(address.clone(), wallet);
        self.save_to_file()?;
        info!("Created wallet {address}");
        Ok(address)
    }

    /// Addresses in a stable, sorted order
    pub fn get_addresses(&self) -> Vec<String> {
        let mut addresses: Vec<String> = self.wallets.keys().cloned().collect();
        addresses.sort();
        addresses
    }

    pub fn get_wallet(&self, address: &str) -> Option<&Wallet> {
        self.wallets.get(address)
    }

    pub fn require_wallet(&self, address: &str) -> Result<&Wallet> {
        self.get_wallet(address)
            .ok_or_else(|| BlockchainError::WalletNotFound(address.to_string()))
    }

    pub fn get_path(&self) -> &Path {
        self.path.as_path()
    }

    fn load_from_file(&mut self) -> Result<()> {
        if !self.path.exists() {
            warn!(
                "No wallet file at {}, starting with an empty keyring",
                self.path.display()
            );
            return Ok(());
        }

        let mut file = File::open(&self.path)?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;
        self.wallets = deserialize(&buf[..]).map_err(|e| {
            BlockchainError::Corruption(format!(
                "Wallet file {} is unreadable: {e}",
                self.path.display()
            ))
        })?;
        Ok(())
    }

    fn save_to_file(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&self.path)?;
        let mut writer = BufWriter::new(file);
        let wallets_bytes = serialize(&self.wallets)?;
        writer.write_all(wallets_bytes.as_slice())?;
        writer.flush()?;
        Ok(())
    }
}
