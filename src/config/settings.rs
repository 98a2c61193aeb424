use crate::error::{BlockchainError, Result};
use log::debug;
use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

static GLOBAL_CONFIG: OnceCell<Settings> = OnceCell::new();

pub const CONFIG_FILE: &str = "ledger.toml";

const DATA_DIR_KEY: &str = "LEDGER_DATA_DIR";
const WALLET_FILE_KEY: &str = "LEDGER_WALLET_FILE";
const MINING_WORKERS_KEY: &str = "LEDGER_MINING_WORKERS";
const NONCE_BUDGET_KEY: &str = "LEDGER_NONCE_BUDGET";

/// Proof-of-work search parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MiningSettings {
    /// Number of threads searching disjoint nonce ranges
    pub workers: usize,
    /// Largest nonce tried before the search gives up
    pub nonce_budget: i64,
}

impl Default for MiningSettings {
    fn default() -> Self {
        Self {
            workers: 1,
            nonce_budget: i64::MAX,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding the block database
    pub data_dir: PathBuf,
    /// Keyring file
    pub wallet_file: PathBuf,
    pub mining: MiningSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("tmp").join("blocks"),
            wallet_file: PathBuf::from("tmp").join(crate::wallet::WALLET_FILE),
            mining: MiningSettings::default(),
        }
    }
}

impl Settings {
    /// Process-wide settings, loaded on first use
    pub fn global() -> Result<&'static Settings> {
        GLOBAL_CONFIG.get_or_try_init(|| Settings::load(Path::new(CONFIG_FILE)))
    }

    /// Defaults, then `path` if it exists, then environment overrides
    pub fn load(path: &Path) -> Result<Settings> {
        let mut settings = if path.exists() {
            debug!("Loading configuration from {}", path.display());
            let text = fs::read_to_string(path)?;
            Self::from_toml(&text)?
        } else {
            Settings::default()
        };
        settings.apply_env(|key| env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml(text: &str) -> Result<Settings> {
        toml::from_str(text).map_err(|e| BlockchainError::Config(format!("Invalid TOML: {e}")))
    }

    fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(DATA_DIR_KEY) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(file) = lookup(WALLET_FILE_KEY) {
            self.wallet_file = PathBuf::from(file);
        }
        if let Some(workers) = lookup(MINING_WORKERS_KEY) {
            self.mining.workers = workers.parse().map_err(|e| {
                BlockchainError::Config(format!("{MINING_WORKERS_KEY}={workers}: {e}"))
            })?;
        }
        if let Some(budget) = lookup(NONCE_BUDGET_KEY) {
            self.mining.nonce_budget = budget.parse().map_err(|e| {
                BlockchainError::Config(format!("{NONCE_BUDGET_KEY}={budget}: {e}"))
            })?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.mining.workers == 0 {
            return Err(BlockchainError::Config(
                "mining.workers must be at least 1".to_string(),
            ));
        }
        if self.mining.nonce_budget < 0 {
            return Err(BlockchainError::Config(
                "mining.nonce_budget must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}
