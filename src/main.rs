// Entry point for the ledger CLI
use clap::Parser;
use data_encoding::HEXLOWER;
use log::{error, LevelFilter};
use std::process;
use tally_chain::{
    address_to_pub_key_hash, validate_address, Blockchain, BlockchainError, Command, Opt,
    ProofOfWork, Result, Settings, Transaction, UTXOSet, Wallets,
};

fn main() {
    // Info by default, RUST_LOG still wins
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let opt = Opt::parse();

    if let Err(e) = run_command(opt.command) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(command: Command) -> Result<()> {
    let settings = Settings::global()?;

    match command {
        Command::Createblockchain { address } => {
            Blockchain::create_blockchain(&address, settings)?;
            println!("Finished!");
        }
        Command::Createwallet => {
            let mut wallets = Wallets::load(&settings.wallet_file)?;
            let address = wallets.create_wallet()?;
            println!("New address is: {address}");
        }
        Command::GetBalance { address } => {
            let pub_key_hash = address_to_pub_key_hash(&address)?;
            let blockchain = Blockchain::open_blockchain(settings)?;
            let utxo_set = UTXOSet::new(blockchain);
            let balance = utxo_set.get_balance(&pub_key_hash)?;
            println!("Balance of {address}: {balance}");
        }
        Command::ListAddresses => {
            let wallets = Wallets::load(&settings.wallet_file)?;
            for address in wallets.get_addresses() {
                println!("{address}");
            }
        }
        Command::Send { from, to, amount } => {
            if !validate_address(&from) {
                return Err(BlockchainError::InvalidAddress(from));
            }
            if !validate_address(&to) {
                return Err(BlockchainError::InvalidAddress(to));
            }

            let wallets = Wallets::load(&settings.wallet_file)?;
            let wallet = wallets.require_wallet(&from)?;
            let blockchain = Blockchain::open_blockchain(settings)?;
            let utxo_set = UTXOSet::new(blockchain.clone());

            let transaction = Transaction::new_utxo_transaction(wallet, &to, amount, &utxo_set)?;
            blockchain.mine_block(&[transaction])?;
            println!("Success!");
        }
        Command::Print => {
            let blockchain = Blockchain::open_blockchain(settings)?;
            for block in blockchain.iterator()? {
                let block = block?;
                println!("Previous Hash: {}", HEXLOWER.encode(block.get_pre_block_hash()));
                println!("Hash: {}", HEXLOWER.encode(block.get_hash()));
                println!("Nonce: {}", block.get_nonce());
                println!("PoW: {}", ProofOfWork::validate(&block));
                for tx in block.get_transactions() {
                    println!("{tx}");
                }
                println!();
            }
        }
    }
    Ok(())
}
