//! Parallel proof-of-work search.
//!
//! Nonces are explored in fixed-size batches of `BATCH_SIZE`, scanned in
//! ascending delta order so the accepted nonce is deterministic
//! regardless of thread scheduling. This is the crate's one CPU-bound,
//! bounded-lifetime piece of parallelism, so it runs on `std::thread::scope`
//! native threads rather than the async runtime.

use crate::core::block::Block;
use crate::crypto;
use num_bigint::{BigInt, Sign};
use tracing::{debug, trace};

/// Nonces explored per parallel batch.
pub const BATCH_SIZE: u64 = 32;

/// `T(nbits) = 2^(256-nbits)`.
pub fn target(nbits: u8) -> BigInt {
    BigInt::from(1) << (256 - nbits as u32)
}

/// `int(hash) < T(nbits)`.
pub fn meets_target(hash: &[u8], nbits: u8) -> bool {
    BigInt::from_bytes_be(Sign::Plus, hash) < target(nbits)
}

/// Searches for a nonce satisfying `block`'s target. Returns `(nonce,
/// hash)`; if the nonce space is exhausted without success (not
/// expected at `nbits = 16`) the block is returned un-mined with
/// `nonce = u64::MAX` and an empty hash.
pub fn mine(block: &Block) -> (u64, Vec<u8>) {
    let t = target(block.nbits);
    let mut base: u64 = 0;
    debug!(nbits = block.nbits, "mining block");

    loop {
        if base.checked_add(BATCH_SIZE - 1).is_none() {
            return (u64::MAX, vec![]);
        }

        let batch: Vec<Vec<u8>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..BATCH_SIZE)
                .map(|delta| {
                    let nonce = base + delta;
                    scope.spawn(move || {
                        let preimage = block.header_preimage(nonce);
                        crypto::sha256_digest(&preimage)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("proof-of-work worker thread panicked"))
                .collect()
        });

        for (delta, hash) in batch.iter().enumerate() {
            if BigInt::from_bytes_be(Sign::Plus, hash) < t {
                let nonce = base + delta as u64;
                trace!(nonce, "found qualifying nonce");
                return (nonce, hash.clone());
            }
        }

        base += BATCH_SIZE;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transaction::Transaction;
    use crate::wallet::Wallet;

    #[test]
    fn target_halves_per_bit() {
        assert_eq!(target(1), target(0) / 2);
    }

    #[test]
    fn mined_block_meets_its_own_target() {
        let address = Wallet::new().unwrap().get_address().unwrap();
        let coinbase = Transaction::new_coinbase(&address, b"note").unwrap();
        let block = Block::new_genesis(coinbase);
        assert!(meets_target(&block.hash, block.nbits));
    }

    #[test]
    fn mining_is_deterministic_for_fixed_inputs() {
        let address = Wallet::new().unwrap().get_address().unwrap();
        let coinbase = Transaction::new_coinbase(&address, b"note").unwrap();
        let mut block = Block::new_genesis(coinbase);
        block.nonce = 0;
        block.hash = vec![];
        let (nonce_a, hash_a) = mine(&block);
        let (nonce_b, hash_b) = mine(&block);
        assert_eq!(nonce_a, nonce_b);
        assert_eq!(hash_a, hash_b);
    }
}
