//! ECDSA P-256 key pair generation.
//!
//! Private keys are generated and stored in PKCS#8 form. `ring` only
//! exports PKCS#8 from `EcdsaKeyPair::generate_pkcs8`, so PKCS#8 is the
//! fixed, documented choice for the on-disk wallet format.

use crate::error::{LedgerError, Result};
use ring::rand::SystemRandom;
use ring::signature::{ECDSA_P256_SHA256_FIXED_SIGNING, EcdsaKeyPair};

/// Generates a new ECDSA P-256 key pair and returns the private key
/// serialized as a PKCS#8 document.
pub fn new_key_pair() -> Result<Vec<u8>> {
    let rng = SystemRandom::new();
    let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, &rng)
        .map_err(|e| LedgerError::CryptoError(e.to_string()))?;
    Ok(pkcs8.as_ref().to_vec())
}

/// Derives the fixed-width `X ‖ Y` public key bytes from a PKCS#8 private key.
pub fn public_key_from_pkcs8(pkcs8: &[u8]) -> Result<Vec<u8>> {
    let rng = SystemRandom::new();
    let key_pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8, &rng)
        .map_err(|e| LedgerError::CryptoError(e.to_string()))?;
    // ring's public key for ECDSA_P256_* is the uncompressed SEC1 point
    // 0x04 ‖ X ‖ Y; strip the tag so stored public keys are the bare,
    // fixed-width X ‖ Y concatenation the codec uses elsewhere.
    let uncompressed = key_pair.public_key().as_ref();
    Ok(uncompressed[1..].to_vec())
}
