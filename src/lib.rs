pub mod codec;
pub mod config;
pub mod core;
pub mod crypto;
pub mod error;
pub mod store;
pub mod wallet;

pub use config::Config;
pub use core::*;
pub use crypto::*;
pub use error::*;
pub use store::Store;
pub use wallet::{Wallet, Wallets};
