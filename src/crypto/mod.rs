//! Cryptographic primitives: hashing, ECDSA P-256 key pairs, signing, and
//! base58 addressing. Kept as the single home for these concerns rather
//! than duplicated across a separate utility module.

pub mod address;
pub mod hash;
pub mod keypair;
pub mod signature;

pub use address::{
    address, address_checksum, base58_decode, base58_encode, extract_pub_key_hash, hash_pub_key,
    validate_address,
};
pub use hash::sha256_digest;
pub use keypair::{new_key_pair, public_key_from_pkcs8};
pub use signature::{ecdsa_p256_sha256_sign_digest, ecdsa_p256_sha256_sign_verify};
