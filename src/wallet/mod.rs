//! Address & Keystore: ECDSA P-256 wallets and the on-disk address →
//! wallet map, addressed through the explicit `Config` rather than an
//! environment variable read directly inside the module.

pub mod wallet;
pub mod wallets;

pub use wallet::{ADDRESS_VERSION, Wallet};
pub use wallets::Wallets;
