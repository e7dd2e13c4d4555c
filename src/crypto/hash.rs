//! SHA-256 hashing.
//!
//! Used for transaction ids, the block header pre-image, public-key
//! hashing for addresses, and address checksums.

use ring::digest::{Context, SHA256};

/// SHA-256 of `data`.
pub fn sha256_digest(data: &[u8]) -> Vec<u8> {
    let mut context = Context::new(&SHA256);
    context.update(data);
    context.finish().as_ref().to_vec()
}
