use crate::error::{LedgerError, Result};

/// Length, in bytes, of the double-SHA-256 address checksum.
pub const ADDRESS_CHECK_SUM_LEN: usize = 4;

///
/// The `base58_encode` function encodes the given byte slice using the Base58 encoding scheme
/// and returns the encoded string representation.
/// It utilizes bs58 crate to perform the encoding and converts the byte data into a Base58-encoded string.
///
/// # Usage Locations
///
/// - `address()`, to encode the version ‖ pub_key_hash ‖ checksum payload.
///
/// # Arguments
///
/// * `data` - A reference to the input data to be Base58 encoded.
pub fn base58_encode(data: &[u8]) -> String {
    bs58::encode(data).into_string()
}

///
/// The `base58_decode` function decodes a Base58-encoded string back to its original byte representation.
/// It uses the bs58 crate to decode the input string and returns the decoded byte vector.
///
/// # Usage Locations
///
/// - `validate_address()` and `extract_pub_key_hash()`, to recover the version/body/checksum payload.
///
/// # Arguments
///
/// * `data` - A reference to the Base58-encoded string to be decoded (typically an address).
///
/// # Error Handling
///
/// Returns `LedgerError::InvalidAddress` if the input string is not valid Base58.
pub fn base58_decode(data: &str) -> Result<Vec<u8>> {
    bs58::decode(data)
        .into_vec()
        .map_err(|e| LedgerError::InvalidAddress(e.to_string()))
}

/// `checksum4 = SHA-256(SHA-256(payload))[:4]`.
pub fn address_checksum(payload: &[u8]) -> Vec<u8> {
    let first = crate::crypto::hash::sha256_digest(payload);
    let second = crate::crypto::hash::sha256_digest(&first);
    second[0..ADDRESS_CHECK_SUM_LEN].to_vec()
}

/// `hash_pub_key(pub_key) = SHA-256(pub_key)`.
pub fn hash_pub_key(pub_key: &[u8]) -> Vec<u8> {
    crate::crypto::hash::sha256_digest(pub_key)
}

/// Base58 of `version_le_u32 ‖ pub_key_hash ‖ checksum4`.
pub fn address(pub_key_hash: &[u8], version: u32) -> String {
    let mut payload = version.to_le_bytes().to_vec();
    payload.extend_from_slice(pub_key_hash);
    let checksum = address_checksum(&payload);
    payload.extend_from_slice(&checksum);
    base58_encode(&payload)
}

/// Base58-decodes `addr`, recomputes the checksum over `version ‖ body`,
/// and reports whether it matches the trailing checksum bytes.
pub fn validate_address(addr: &str) -> Result<bool> {
    let payload = base58_decode(addr)?;
    if payload.len() < 4 + ADDRESS_CHECK_SUM_LEN {
        return Err(LedgerError::InvalidAddress(
            "address payload too short".to_string(),
        ));
    }
    let split = payload.len() - ADDRESS_CHECK_SUM_LEN;
    let (version_and_body, actual_checksum) = payload.split_at(split);
    let expected_checksum = address_checksum(version_and_body);
    Ok(actual_checksum == expected_checksum.as_slice())
}

/// Base58-decodes `addr` and returns the `pub_key_hash` body, stripping the
/// leading 4-byte version and the trailing 4-byte checksum.
pub fn extract_pub_key_hash(addr: &str) -> Result<Vec<u8>> {
    let payload = base58_decode(addr)?;
    if payload.len() < 4 + ADDRESS_CHECK_SUM_LEN {
        return Err(LedgerError::InvalidAddress(
            "address payload too short".to_string(),
        ));
    }
    let end = payload.len() - ADDRESS_CHECK_SUM_LEN;
    Ok(payload[4..end].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_round_trip() {
        let pub_key_hash = crate::crypto::hash::sha256_digest(b"a public key");
        let addr = address(&pub_key_hash, 0);
        assert!(validate_address(&addr).unwrap());
        assert_eq!(extract_pub_key_hash(&addr).unwrap(), pub_key_hash);
    }

    #[test]
    fn tampered_address_fails_checksum() {
        let pub_key_hash = crate::crypto::hash::sha256_digest(b"a public key");
        let mut addr = address(&pub_key_hash, 0).into_bytes();
        let last = addr.len() - 1;
        addr[last] = if addr[last] == b'1' { b'2' } else { b'1' };
        let addr = String::from_utf8(addr).unwrap();
        assert!(!validate_address(&addr).unwrap_or(false));
    }

    #[test]
    fn base58_round_trip() {
        let data = b"arbitrary payload bytes";
        let encoded = base58_encode(data);
        assert_eq!(base58_decode(&encoded).unwrap(), data);
    }
}
