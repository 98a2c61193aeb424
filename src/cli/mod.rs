//! Command-line interface
//!
//! Argument parsing for the ledger binary. Each subcommand opens the chain or
//! keyring it needs, does one thing, and exits.

pub mod commands;

pub use commands::{Command, Opt};
