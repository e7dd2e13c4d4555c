//! ECDSA P-256 signing and verification over fixed-width `r ‖ s` signatures.
//!
//! Uses `ring`'s `_FIXED` algorithm variants, which produce and verify
//! fixed-width signatures and expect fixed-width `X ‖ Y` public keys.
//! This sidesteps the leading-zero truncation bug a naive BigInt-based
//! split would hit: there is no manual padding step to forget because
//! the encoding is fixed-width by construction.

use crate::error::{LedgerError, Result};
use ring::rand::SystemRandom;
use ring::signature::{
    ECDSA_P256_SHA256_FIXED, ECDSA_P256_SHA256_FIXED_SIGNING, EcdsaKeyPair, UnparsedPublicKey,
};

/// Signs `message` with the ECDSA P-256 private key `pkcs8` (PKCS#8 form).
/// Returns the fixed-width `r ‖ s` signature.
pub fn ecdsa_p256_sha256_sign_digest(pkcs8: &[u8], message: &[u8]) -> Result<Vec<u8>> {
    let rng = SystemRandom::new();
    let key_pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8, &rng)
        .map_err(|e| LedgerError::CryptoError(e.to_string()))?;
    key_pair
        .sign(&rng, message)
        .map(|sig| sig.as_ref().to_vec())
        .map_err(|e| LedgerError::CryptoError(e.to_string()))
}

/// Verifies a fixed-width `r ‖ s` signature against `message` using the
/// fixed-width `X ‖ Y` public key `public_key`.
pub fn ecdsa_p256_sha256_sign_verify(public_key: &[u8], signature: &[u8], message: &[u8]) -> bool {
    // ring's unparsed public key expects the SEC1 uncompressed tag; public
    // keys are stored bare (X ‖ Y), so re-attach it here.
    let mut tagged = Vec::with_capacity(public_key.len() + 1);
    tagged.push(0x04);
    tagged.extend_from_slice(public_key);
    let peer_public_key = UnparsedPublicKey::new(&ECDSA_P256_SHA256_FIXED, tagged);
    peer_public_key.verify(message, signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keypair::{new_key_pair, public_key_from_pkcs8};

    #[test]
    fn round_trip() {
        let pkcs8 = new_key_pair().unwrap();
        let pub_key = public_key_from_pkcs8(&pkcs8).unwrap();
        let message = b"a transaction pre-image";
        let signature = ecdsa_p256_sha256_sign_digest(&pkcs8, message).unwrap();
        assert!(ecdsa_p256_sha256_sign_verify(&pub_key, &signature, message));
    }

    #[test]
    fn rejects_tampered_message() {
        let pkcs8 = new_key_pair().unwrap();
        let pub_key = public_key_from_pkcs8(&pkcs8).unwrap();
        let signature = ecdsa_p256_sha256_sign_digest(&pkcs8, b"original").unwrap();
        assert!(!ecdsa_p256_sha256_sign_verify(&pub_key, &signature, b"tampered"));
    }

    #[test]
    fn signature_is_fixed_width() {
        let pkcs8 = new_key_pair().unwrap();
        let signature = ecdsa_p256_sha256_sign_digest(&pkcs8, b"msg").unwrap();
        assert_eq!(signature.len(), 64);
    }
}
