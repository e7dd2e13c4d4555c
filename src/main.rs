//! The command-line front end: one real binary exercising the ledger
//! core end to end. A `#[derive(Parser)]` top-level struct, a
//! `#[derive(Subcommand)]` enum with one variant per command, and a
//! small async handler function per command.

use blockchain::{Chain, Config, LedgerError, Result, Store, Wallets, crypto, hash_pub_key};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    fmt,
    prelude::*,
};

#[derive(Debug, Parser)]
#[command(name = "blockchain")]
struct Opt {
    /// Keystore file (address -> wallet map). Defaults to `./wallets.dat`.
    #[arg(long, env = "WALLET_FILE")]
    wallet_file: Option<PathBuf>,

    /// `sled` store directory. Defaults to `./chaindata`.
    #[arg(long, env = "TREE_DIR")]
    store_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Create a new wallet")]
    Createwallet,

    #[command(about = "Print the addresses in the local keystore")]
    Printwallets,

    #[command(about = "Get the wallet balance of the target address", visible_alias = "balance")]
    Getbalance {
        #[arg(short = 'a', long)]
        address: String,
    },

    #[command(about = "Send value from one address to another")]
    Send {
        #[arg(short = 'f', long)]
        from: String,
        #[arg(short = 't', long)]
        to: String,
        #[arg(short = 'a', long)]
        amount: i64,
    },

    #[command(about = "Print every block in the chain")]
    Printchain,
}

fn initialize_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(fmt::layer().with_filter(filter))
        .init();
}

fn create_wallet(config: &Config) -> Result<()> {
    let mut wallets = Wallets::new(config)?;
    let address = wallets.create_wallet(config)?;
    info!(%address, "created wallet");
    println!("Your new address: {address}");
    Ok(())
}

fn print_wallets(config: &Config) -> Result<()> {
    let wallets = Wallets::new(config)?;
    for address in wallets.get_addresses() {
        println!("{address}");
    }
    Ok(())
}

async fn get_balance(config: &Config, address: &str) -> Result<()> {
    if !crypto::validate_address(address)? {
        return Err(LedgerError::InvalidAddress(address.to_string()));
    }
    let pub_key_hash = crypto::extract_pub_key_hash(address)?;
    let store = Store::open(&config.store_path).await?;
    let chain = Chain::open(store, "").await?;
    let balance = chain.balance_scan(&pub_key_hash).await?;
    info!(%address, balance, "computed balance");
    println!("Balance of {address}: {balance}");
    Ok(())
}

async fn send(config: &Config, from: &str, to: &str, amount: i64) -> Result<()> {
    if !crypto::validate_address(from)? {
        return Err(LedgerError::InvalidAddress(from.to_string()));
    }
    if !crypto::validate_address(to)? {
        return Err(LedgerError::InvalidAddress(to.to_string()));
    }

    let wallets = Wallets::new(config)?;
    let store = Store::open(&config.store_path).await?;
    let chain = Chain::open(store, from).await?;

    let tx = chain.new_utxo_tx(&wallets, from, to, amount).await?;
    let reward_tx = blockchain::Transaction::new_coinbase(from, b"reward")?;
    let block = chain.mine_block(&[reward_tx, tx]).await?;

    info!(hash = %hex(&block.hash), "mined block for send");
    println!("Success!");
    Ok(())
}

fn format_transaction_input(input: &blockchain::TXInput) -> String {
    if input.prev_txid.is_empty() {
        return "  -- Input: coinbase".to_string();
    }
    let address = convert_address(&hash_pub_key(&input.pub_key));
    format!(
        "  -- Input txid = {}, vout = {}, from = {}",
        hex(&input.prev_txid),
        input.vout_index,
        address,
    )
}

fn format_transaction_output(output: &blockchain::TXOutput) -> String {
    format!(
        "  -- Output value = {}, to = {}",
        output.value,
        convert_address(&output.pub_key_hash),
    )
}

fn convert_address(pub_key_hash: &[u8]) -> String {
    crypto::address(pub_key_hash, blockchain::wallet::ADDRESS_VERSION)
}

fn print_transaction(tx: &blockchain::Transaction) {
    println!("- Transaction {}:", hex(&tx.id));
    if !tx.is_coinbase() {
        for input in &tx.vin {
            println!("{}", format_transaction_input(input));
        }
    }
    for output in &tx.vout {
        println!("{}", format_transaction_output(output));
    }
}

async fn print_chain(config: &Config) -> Result<()> {
    let store = Store::open(&config.store_path).await?;
    let chain = Chain::open(store, "").await?;
    let mut iter = chain.iterator().await?;
    while let Some(block) = iter.next() {
        println!("Pre hash: {}", hex(&block.prev_hash));
        println!("Cur hash: {}", hex(&block.hash));
        println!("Timestamp: {}", block.timestamp);
        println!("Valid: {}", block.validate());
        for tx in &block.transactions {
            print_transaction(tx);
        }
        println!();
    }
    Ok(())
}

fn hex(bytes: &[u8]) -> String {
    data_encoding::HEXLOWER.encode(bytes)
}

async fn process_command(config: &Config, command: Command) -> Result<()> {
    match command {
        Command::Createwallet => create_wallet(config),
        Command::Printwallets => print_wallets(config),
        Command::Getbalance { address } => get_balance(config, &address).await,
        Command::Send { from, to, amount } => send(config, &from, &to, amount).await,
        Command::Printchain => print_chain(config).await,
    }
}

#[tokio::main]
async fn main() {
    initialize_logging();

    let opt = Opt::parse();
    let wallet_file = opt
        .wallet_file
        .unwrap_or_else(|| PathBuf::from(blockchain::config::DEFAULT_WALLET_FILE));
    let store_path = opt
        .store_path
        .unwrap_or_else(|| PathBuf::from(blockchain::config::DEFAULT_STORE_PATH));
    let config = Config::new(wallet_file, store_path);

    if let Err(e) = process_command(&config, opt.command).await {
        error!("{e}");
        std::process::exit(1);
    }
}
