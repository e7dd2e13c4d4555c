//! Transaction construction, the trimmed-copy signing pre-image, and
//! sign/verify. `is_coinbase` checks input shape (count and vout index)
//! before touching any field as key material, so a malformed coinbase
//! can never be misread as carrying a real public key.

use crate::codec;
use crate::crypto;
use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fixed block reward. No fee model.
pub const REWARD: i64 = 50;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TXInput {
    pub prev_txid: Vec<u8>,
    pub vout_index: i64,
    pub signature: Vec<u8>,
    pub pub_key: Vec<u8>,
}

impl TXInput {
    /// True when `pub_key` hashes to `pub_key_hash`; used by spend
    /// selection and the UTXO index, never by coinbase detection.
    pub fn uses_key(&self, pub_key_hash: &[u8]) -> bool {
        crypto::hash_pub_key(&self.pub_key) == pub_key_hash
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TXOutput {
    pub value: i64,
    pub pub_key_hash: Vec<u8>,
}

impl TXOutput {
    pub fn new(value: i64, address: &str) -> Result<TXOutput> {
        let pub_key_hash = crypto::extract_pub_key_hash(address)?;
        Ok(TXOutput {
            value,
            pub_key_hash,
        })
    }

    pub fn is_locked_with_key(&self, pub_key_hash: &[u8]) -> bool {
        self.pub_key_hash == pub_key_hash
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    pub id: Vec<u8>,
    pub vin: Vec<TXInput>,
    pub vout: Vec<TXOutput>,
}

impl Transaction {
    /// One input with empty `prev_txid`, `vout_index = -1`, and `note` as
    /// its `pub_key` payload; one output of `REWARD` locked to `to`.
    pub fn new_coinbase(to: &str, note: &[u8]) -> Result<Transaction> {
        let vin = vec![TXInput {
            prev_txid: vec![],
            vout_index: -1,
            signature: vec![],
            pub_key: note.to_vec(),
        }];
        let vout = vec![TXOutput::new(REWARD, to)?];
        let mut tx = Transaction {
            id: vec![],
            vin,
            vout,
        };
        tx.id = tx.hash()?;
        Ok(tx)
    }

    /// Builds an unsigned spending transaction from already-selected
    /// `(prev_txid, vout_index)` pairs and the sender's public key. The
    /// caller is responsible for signing it afterward.
    pub fn new_utxo_transaction(
        from_pub_key: &[u8],
        to: &str,
        from: &str,
        amount: i64,
        accumulated: i64,
        spendable: Vec<(Vec<u8>, i64)>,
    ) -> Result<Transaction> {
        let vin = spendable
            .into_iter()
            .map(|(prev_txid, vout_index)| TXInput {
                prev_txid,
                vout_index,
                signature: vec![],
                pub_key: from_pub_key.to_vec(),
            })
            .collect();

        let mut vout = vec![TXOutput::new(amount, to)?];
        if accumulated > amount {
            vout.push(TXOutput::new(accumulated - amount, from)?);
        }

        let mut tx = Transaction {
            id: vec![],
            vin,
            vout,
        };
        tx.id = tx.hash()?;
        Ok(tx)
    }

    /// `vin.len() <= 1 && vin[0].vout_index == -1`, checked before any
    /// field is interpreted as key material.
    pub fn is_coinbase(&self) -> bool {
        self.vin.len() <= 1 && self.vin.first().map(|v| v.vout_index) == Some(-1)
    }

    /// `SHA-256(encode(tx with id blanked))`.
    pub fn hash(&self) -> Result<Vec<u8>> {
        let mut copy = self.clone();
        copy.id = vec![];
        let bytes = codec::encode(&copy)?;
        Ok(crypto::sha256_digest(&bytes))
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        codec::encode(self)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Transaction> {
        codec::decode(bytes)
    }

    /// A copy with every input's `signature` and `pub_key` cleared.
    fn trimmed_copy(&self) -> Transaction {
        let vin = self
            .vin
            .iter()
            .map(|input| TXInput {
                prev_txid: input.prev_txid.clone(),
                vout_index: input.vout_index,
                signature: vec![],
                pub_key: vec![],
            })
            .collect();
        Transaction {
            id: self.id.clone(),
            vin,
            vout: self.vout.clone(),
        }
    }

    /// Signs each input in turn against the trimmed-copy pre-image.
    /// `prev_txs` maps `prev_txid` to the funding transaction, as
    /// assembled by the chain's sign helper.
    pub fn sign(&mut self, pkcs8: &[u8], prev_txs: &HashMap<Vec<u8>, Transaction>) -> Result<()> {
        if self.is_coinbase() {
            return Ok(());
        }

        for input in &self.vin {
            if !prev_txs.contains_key(&input.prev_txid) {
                return Err(LedgerError::InvalidTransaction(
                    "missing predecessor transaction".to_string(),
                ));
            }
        }

        let mut trimmed = self.trimmed_copy();
        for i in 0..self.vin.len() {
            let prev_tx = &prev_txs[&self.vin[i].prev_txid];
            let vout_index = self.vin[i].vout_index as usize;
            trimmed.vin[i].pub_key = prev_tx.vout[vout_index].pub_key_hash.clone();
            trimmed.id = trimmed.hash()?;

            let signature = crypto::ecdsa_p256_sha256_sign_digest(pkcs8, &trimmed.id)?;
            self.vin[i].signature = signature;

            trimmed.vin[i].pub_key = vec![];
        }
        Ok(())
    }

    /// Mirrors `sign`: rebuilds each input's trimmed-copy pre-image and
    /// verifies the stored signature against it. Coinbase verifies true.
    pub fn verify(&self, prev_txs: &HashMap<Vec<u8>, Transaction>) -> Result<bool> {
        if self.is_coinbase() {
            return Ok(true);
        }

        for input in &self.vin {
            if !prev_txs.contains_key(&input.prev_txid) {
                return Err(LedgerError::InvalidTransaction(
                    "missing predecessor transaction".to_string(),
                ));
            }
        }

        let mut trimmed = self.trimmed_copy();
        for i in 0..self.vin.len() {
            let prev_tx = &prev_txs[&self.vin[i].prev_txid];
            let vout_index = self.vin[i].vout_index as usize;
            trimmed.vin[i].pub_key = prev_tx.vout[vout_index].pub_key_hash.clone();
            trimmed.id = trimmed.hash()?;

            let ok = crypto::ecdsa_p256_sha256_sign_verify(
                &self.vin[i].pub_key,
                &self.vin[i].signature,
                &trimmed.id,
            );
            trimmed.vin[i].pub_key = vec![];
            if !ok {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::Wallet;

    fn signed_pair() -> (Wallet, Wallet, Transaction, HashMap<Vec<u8>, Transaction>) {
        let from_wallet = Wallet::new().unwrap();
        let to_wallet = Wallet::new().unwrap();
        let from_addr = from_wallet.get_address().unwrap();
        let to_addr = to_wallet.get_address().unwrap();

        let coinbase = Transaction::new_coinbase(&from_addr, b"genesis").unwrap();
        let mut prev_txs = HashMap::new();
        prev_txs.insert(coinbase.id.clone(), coinbase.clone());

        let mut spend = Transaction::new_utxo_transaction(
            from_wallet.get_public_key(),
            &to_addr,
            &from_addr,
            30,
            REWARD,
            vec![(coinbase.id.clone(), 0)],
        )
        .unwrap();
        spend.sign(from_wallet.get_pkcs8(), &prev_txs).unwrap();

        (from_wallet, to_wallet, spend, prev_txs)
    }

    #[test]
    fn coinbase_is_detected_and_verifies() {
        let wallet = Wallet::new().unwrap();
        let address = wallet.get_address().unwrap();
        let coinbase = Transaction::new_coinbase(&address, b"note").unwrap();
        assert!(coinbase.is_coinbase());
        assert!(coinbase.verify(&HashMap::new()).unwrap());
        assert_eq!(coinbase.vout[0].value, REWARD);
    }

    #[test]
    fn coinbase_id_is_stable_under_hash() {
        let wallet = Wallet::new().unwrap();
        let address = wallet.get_address().unwrap();
        let coinbase = Transaction::new_coinbase(&address, b"note").unwrap();
        assert_eq!(coinbase.id, coinbase.hash().unwrap());
    }

    #[test]
    fn spend_transaction_verifies() {
        let (_from, _to, spend, prev_txs) = signed_pair();
        assert!(spend.verify(&prev_txs).unwrap());
        assert!(!spend.is_coinbase());
    }

    #[test]
    fn tampering_with_output_value_breaks_verification() {
        let (_from, _to, mut spend, prev_txs) = signed_pair();
        spend.vout[0].value += 1;
        assert!(!spend.verify(&prev_txs).unwrap());
    }

    #[test]
    fn tampering_with_prev_txid_breaks_verification() {
        let (_from, _to, mut spend, prev_txs) = signed_pair();
        spend.vin[0].prev_txid[0] ^= 0xff;
        // A mutated prev_txid that no longer resolves is an invalid
        // transaction rather than a silent verification failure.
        assert!(spend.verify(&prev_txs).is_err());
    }

    #[test]
    fn serialize_round_trip() {
        let (_from, _to, spend, _prev_txs) = signed_pair();
        let bytes = spend.serialize().unwrap();
        let decoded = Transaction::deserialize(&bytes).unwrap();
        assert_eq!(decoded, spend);
    }
}
