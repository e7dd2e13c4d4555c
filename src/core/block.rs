//! Block assembly, mining, and header validation.
//!
//! The header is a flat, binary-field shape: no persisted block height,
//! `hash`/`prev_hash` as raw bytes, `nbits` as a `u8` exponent, `nonce`
//! as `u64`. The "Merkle root" is the flat `SHA-256(concat(tx.id))` hash
//! rather than an actual Merkle tree; no Merkle tree module is built.

use crate::codec;
use crate::core::proof_of_work;
use crate::core::transaction::Transaction;
use crate::crypto;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Difficulty exponent fixed for this core; no difficulty retargeting.
pub const NBITS: u8 = 16;

pub const VERSION: u32 = 0;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Block {
    pub version: u32,
    pub timestamp: i64,
    pub transactions: Vec<Transaction>,
    pub hash: Vec<u8>,
    pub prev_hash: Vec<u8>,
    pub nbits: u8,
    pub nonce: u64,
}

impl Block {
    /// Assembles a block on top of `prev_hash` and runs proof-of-work to
    /// fill in `nonce`/`hash`.
    pub fn new(transactions: Vec<Transaction>, prev_hash: Vec<u8>) -> Block {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        let mut block = Block {
            version: VERSION,
            timestamp,
            transactions,
            hash: vec![],
            prev_hash,
            nbits: NBITS,
            nonce: 0,
        };
        let (nonce, hash) = proof_of_work::mine(&block);
        block.nonce = nonce;
        block.hash = hash;
        block
    }

    /// `new_block([coinbase], ∅)`.
    pub fn new_genesis(coinbase: Transaction) -> Block {
        Block::new(vec![coinbase], vec![])
    }

    /// The flat "Merkle root": `SHA-256(concat(tx.id for tx in
    /// transactions))`. Not a true Merkle tree.
    pub fn hash_transactions(&self) -> Vec<u8> {
        let mut ids = Vec::new();
        for tx in &self.transactions {
            ids.extend_from_slice(&tx.id);
        }
        crypto::sha256_digest(&ids)
    }

    /// The block-header pre-image for a given candidate `nonce`: hex
    /// ASCII of `version` and `timestamp`, then the raw
    /// transaction-hash bytes, then `prev_hash`, then hex ASCII of
    /// `nbits` and `nonce`.
    pub fn header_preimage(&self, nonce: u64) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(format!("{:x}", self.version).as_bytes());
        data.extend_from_slice(format!("{:x}", self.timestamp).as_bytes());
        data.extend_from_slice(&self.hash_transactions());
        data.extend_from_slice(&self.prev_hash);
        data.extend_from_slice(format!("{:x}", self.nbits).as_bytes());
        data.extend_from_slice(format!("{:x}", nonce).as_bytes());
        data
    }

    /// Recomputes the header pre-image with the stored `nonce`, checks
    /// `SHA-256(preimage) == hash`, and checks the target inequality.
    /// Does not re-verify contained transaction signatures.
    pub fn validate(&self) -> bool {
        let preimage = self.header_preimage(self.nonce);
        let hash = crypto::sha256_digest(&preimage);
        hash == self.hash && proof_of_work::meets_target(&hash, self.nbits)
    }

    pub fn is_genesis(&self) -> bool {
        self.prev_hash.is_empty()
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        codec::encode(self)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Block> {
        codec::decode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::Wallet;

    fn genesis_address() -> String {
        Wallet::new().unwrap().get_address().unwrap()
    }

    #[test]
    fn mined_block_is_valid() {
        let coinbase = Transaction::new_coinbase(&genesis_address(), b"genesis").unwrap();
        let block = Block::new_genesis(coinbase);
        assert!(block.validate());
        assert!(block.is_genesis());
    }

    #[test]
    fn serialize_round_trip() {
        let coinbase = Transaction::new_coinbase(&genesis_address(), b"genesis").unwrap();
        let block = Block::new_genesis(coinbase);
        let bytes = block.serialize().unwrap();
        let decoded = Block::deserialize(&bytes).unwrap();
        assert_eq!(decoded, block);
    }

    #[test]
    fn hash_transactions_is_flat_digest_of_ids() {
        let coinbase = Transaction::new_coinbase(&genesis_address(), b"genesis").unwrap();
        let block = Block::new_genesis(coinbase.clone());
        assert_eq!(block.hash_transactions(), crypto::sha256_digest(&coinbase.id));
    }

    #[test]
    fn tampered_hash_fails_validation() {
        let coinbase = Transaction::new_coinbase(&genesis_address(), b"genesis").unwrap();
        let mut block = Block::new_genesis(coinbase);
        block.hash[0] ^= 0xff;
        assert!(!block.validate());
    }
}
