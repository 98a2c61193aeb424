use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "tally-chain", about = "Single-node hash-linked ledger")]
pub struct Opt {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    #[command(name = "createblockchain", about = "Create a new blockchain")]
    Createblockchain {
        #[arg(long, help = "The address to send genesis block reward to")]
        address: String,
    },
    #[command(name = "createwallet", about = "Create a new wallet")]
    Createwallet,
    #[command(
        name = "getbalance",
        about = "Get the wallet balance of the target address"
    )]
    GetBalance {
        #[arg(long, help = "The wallet address")]
        address: String,
    },
    #[command(name = "listaddresses", about = "Print local wallet addresses")]
    ListAddresses,
    #[command(name = "send", about = "Send coins and mine them into a new block")]
    Send {
        #[arg(long, help = "Source wallet address")]
        from: String,
        #[arg(long, help = "Destination wallet address")]
        to: String,
        #[arg(long, help = "Amount to send", value_parser = clap::value_parser!(u64).range(1..))]
        amount: u64,
    },
    #[command(name = "print", about = "Print all blocks, newest first")]
    Print,
}
