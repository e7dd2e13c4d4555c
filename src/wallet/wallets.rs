//! Keystore persistence: a single codec-encoded file mapping address to
//! wallet. Loading tolerates an absent file (empty map); saving is always
//! a full rewrite.

use super::wallet::Wallet;
use crate::codec;
use crate::config::Config;
use crate::error::Result;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};

pub struct Wallets {
    wallets: HashMap<String, Wallet>,
}

impl Wallets {
    /// Loads the keystore named by `config.wallet_file`, or starts empty if
    /// the file does not exist.
    pub fn new(config: &Config) -> Result<Wallets> {
        let mut wallets = Wallets {
            wallets: HashMap::new(),
        };
        wallets.load_from_file(config)?;
        Ok(wallets)
    }

    /// Generates a new wallet, inserts it under its own address, and
    /// persists the whole keystore. Returns the new address.
    pub fn create_wallet(&mut self, config: &Config) -> Result<String> {
        let wallet = Wallet::new()?;
        let address = wallet.get_address()?;
        self.wallets.insert(address.clone(), wallet);
        self.save_to_file(config)?;
        Ok(address)
    }

    pub fn get_addresses(&self) -> Vec<String> {
        self.wallets.keys().cloned().collect()
    }

    pub fn get_wallet(&self, address: &str) -> Option<&Wallet> {
        self.wallets.get(address)
    }

    fn load_from_file(&mut self, config: &Config) -> Result<()> {
        if !config.wallet_file.exists() {
            return Ok(());
        }
        let bytes = fs::read(&config.wallet_file)?;
        if bytes.is_empty() {
            return Ok(());
        }
        self.wallets = codec::decode(&bytes)?;
        Ok(())
    }

    fn save_to_file(&self, config: &Config) -> Result<()> {
        let file = File::create(&config.wallet_file)?;
        let mut writer = BufWriter::new(file);
        let bytes = codec::encode(&self.wallets)?;
        writer.write_all(&bytes)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_config(dir: &TempDir) -> Config {
        Config::new(dir.path().join("wallets.dat"), dir.path().join("chaindata"))
    }

    #[test]
    fn load_from_absent_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let config = temp_config(&dir);
        let wallets = Wallets::new(&config).unwrap();
        assert!(wallets.get_addresses().is_empty());
    }

    #[test]
    fn create_wallet_persists_and_reloads() {
        let dir = TempDir::new().unwrap();
        let config = temp_config(&dir);
        let mut wallets = Wallets::new(&config).unwrap();
        let address = wallets.create_wallet(&config).unwrap();

        let reloaded = Wallets::new(&config).unwrap();
        assert_eq!(reloaded.get_addresses(), vec![address.clone()]);
        assert!(reloaded.get_wallet(&address).is_some());
    }
}
