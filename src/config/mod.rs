//! Configuration management
//!
//! Where the chain and keyring live, and how hard the miner is allowed to
//! search. Library constructors take these values explicitly; only the CLI
//! reads the process-wide copy.

pub mod settings;

pub use settings::{MiningSettings, Settings, CONFIG_FILE};
