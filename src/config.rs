//! Explicit, passed-by-value configuration.
//!
//! No process-wide singleton: a `Config` is built once in `main` and
//! passed by reference into `Wallets`, `Store`, and `Chain`, so tests can
//! freely redirect paths to a temporary directory.

use std::path::PathBuf;

pub const DEFAULT_WALLET_FILE: &str = "wallets.dat";
pub const DEFAULT_STORE_PATH: &str = "chaindata";
pub const BLOCKCHAIN_VERSION: u32 = 0;

#[derive(Clone, Debug)]
pub struct Config {
    pub wallet_file: PathBuf,
    pub store_path: PathBuf,
    pub blockchain_version: u32,
}

impl Config {
    pub fn new(wallet_file: PathBuf, store_path: PathBuf) -> Self {
        Config {
            wallet_file,
            store_path,
            blockchain_version: BLOCKCHAIN_VERSION,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new(
            PathBuf::from(DEFAULT_WALLET_FILE),
            PathBuf::from(DEFAULT_STORE_PATH),
        )
    }
}
