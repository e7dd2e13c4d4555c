//! A single ECDSA P-256 wallet: a private key plus its derived address.

use crate::crypto;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Version byte folded into the address payload. Fixed at 0 in this core.
pub const ADDRESS_VERSION: u32 = 0;

#[derive(Clone, Serialize, Deserialize)]
pub struct Wallet {
    /// PKCS#8-encoded ECDSA P-256 private key.
    private_key: Vec<u8>,
    /// Fixed-width `X ‖ Y` public key bytes.
    public_key: Vec<u8>,
}

impl Wallet {
    /// Generates a fresh ECDSA P-256 key pair.
    pub fn new() -> Result<Wallet> {
        let private_key = crypto::new_key_pair()?;
        let public_key = crypto::public_key_from_pkcs8(&private_key)?;
        Ok(Wallet {
            private_key,
            public_key,
        })
    }

    /// The base58 address derived from this wallet's public key.
    pub fn get_address(&self) -> Result<String> {
        let pub_key_hash = crypto::hash_pub_key(&self.public_key);
        Ok(crypto::address(&pub_key_hash, ADDRESS_VERSION))
    }

    pub fn get_public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// The PKCS#8-encoded private key, as consumed by the signing helpers.
    pub fn get_pkcs8(&self) -> &[u8] {
        &self.private_key
    }
}
