//! The chain: bootstrap, tip-to-genesis iteration, mining, transaction
//! lookup, and the signing/spend-selection helpers the CLI builds
//! transactions through.
//!
//! The tip pointer lives in the store itself rather than a field cached
//! on this type, since `Store::get_last` is already the single
//! persisted source of truth; `Store` holds its own in-memory tip-hash
//! cache behind a `tokio::sync::RwLock` so that read doesn't round-trip
//! the database.

use crate::core::block::Block;
use crate::core::transaction::{TXOutput, Transaction};
use crate::core::utxo_set::UTXOSet;
use crate::crypto;
use crate::error::{LedgerError, Result};
use crate::store::Store;
use crate::wallet::Wallets;
use std::collections::HashMap;
use tracing::{debug, info, warn};

pub struct Chain {
    store: Store,
}

impl Chain {
    /// Bootstraps the chain:
    /// 1. If the store already has a tip, the chain is already initialized.
    /// 2. Else if `address` is empty, open an empty, mining-incapable chain
    ///    (used by read-only commands such as `printchain`/`getbalance`
    ///    against an uninitialized store).
    /// 3. Else mine a genesis block paying the coinbase reward to
    ///    `address` and reindex the UTXO set.
    pub async fn open(store: Store, address: &str) -> Result<Chain> {
        if store.get_last().await?.is_some() {
            return Ok(Chain { store });
        }
        if address.is_empty() {
            return Ok(Chain { store });
        }

        let coinbase = Transaction::new_coinbase(address, b"genesis")?;
        let genesis = Block::new_genesis(coinbase);
        info!(hash = %hex(&genesis.hash), "mined genesis block");
        store.put_block(&genesis).await?;
        store.set_last(&genesis.hash).await?;

        let chain = Chain { store };
        UTXOSet::new(&chain.store).reindex(&chain).await?;
        Ok(chain)
    }

    /// The current tip hash, or `None` for an uninitialized chain.
    pub async fn tip(&self) -> Result<Option<Vec<u8>>> {
        self.store.get_last().await
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// A lazy sequence of blocks from the tip backward to genesis, as a
    /// reverse linked traversal. Restartable by calling this again; no
    /// cursor escapes it.
    pub async fn iterator(&self) -> Result<ChainIter> {
        let tip = self.tip().await?;
        Ok(ChainIter {
            store: self.store.clone(),
            next_hash: tip,
        })
    }

    /// Linear scan from the tip; `NotFound` if exhausted.
    pub async fn find_transaction(&self, id: &[u8]) -> Result<Transaction> {
        let mut iter = self.iterator().await?;
        while let Some(block) = iter.next() {
            for tx in &block.transactions {
                if tx.id == id {
                    return Ok(tx.clone());
                }
            }
        }
        Err(LedgerError::NotFound(format!(
            "transaction {}",
            hex(id)
        )))
    }

    /// Resolves every `vin.prev_txid` referenced by `tx` via
    /// `find_transaction`, assembling the predecessor map signing and
    /// verification need.
    async fn predecessor_map(&self, tx: &Transaction) -> Result<HashMap<Vec<u8>, Transaction>> {
        let mut prev_txs = HashMap::new();
        if tx.is_coinbase() {
            return Ok(prev_txs);
        }
        for input in &tx.vin {
            if !prev_txs.contains_key(&input.prev_txid) {
                let prev_tx = self.find_transaction(&input.prev_txid).await?;
                prev_txs.insert(input.prev_txid.clone(), prev_tx);
            }
        }
        Ok(prev_txs)
    }

    /// Resolves `tx`'s predecessors and signs it with `pkcs8`.
    pub async fn sign(&self, tx: &mut Transaction, pkcs8: &[u8]) -> Result<()> {
        let prev_txs = self.predecessor_map(tx).await?;
        tx.sign(pkcs8, &prev_txs)
    }

    /// Mines `txs` into a new block on top of the current tip: verifies
    /// every transaction against its predecessors, persists the
    /// block, advances the tip, and updates the UTXO index.
    pub async fn mine_block(&self, txs: &[Transaction]) -> Result<Block> {
        for tx in txs {
            let prev_txs = self.predecessor_map(tx).await?;
            if !tx.verify(&prev_txs)? {
                return Err(LedgerError::InvalidTransaction(format!(
                    "transaction {} failed verification",
                    hex(&tx.id)
                )));
            }
        }

        let prev_hash = self.tip().await?.unwrap_or_default();
        let block = Block::new(txs.to_vec(), prev_hash);
        debug!(hash = %hex(&block.hash), "mined block");

        self.store.put_block(&block).await?;
        self.store.set_last(&block.hash).await?;
        UTXOSet::new(&self.store).update_with_block(&block).await?;
        Ok(block)
    }

    /// Every `(tx_id, still-unspent outputs)` pair reachable from the
    /// tip, computed by a full backward scan. Positions within each
    /// output list are not remapped to the original `vout` index once
    /// earlier outputs of the same transaction have been spent (the
    /// same pub-key-hash matching limitation documented on `UTXOSet`
    /// applies identically here).
    pub async fn find_unspent_txo(&self) -> Result<HashMap<Vec<u8>, Vec<TXOutput>>> {
        let mut unspent: HashMap<Vec<u8>, Vec<TXOutput>> = HashMap::new();
        let mut spent: HashMap<Vec<u8>, Vec<i64>> = HashMap::new();

        let mut iter = self.iterator().await?;
        while let Some(block) = iter.next() {
            for tx in &block.transactions {
                let spent_here = spent.get(&tx.id);
                for (idx, out) in tx.vout.iter().enumerate() {
                    let already_spent = spent_here
                        .map(|indices| indices.contains(&(idx as i64)))
                        .unwrap_or(false);
                    if !already_spent {
                        unspent.entry(tx.id.clone()).or_default().push(out.clone());
                    }
                }
                if !tx.is_coinbase() {
                    for input in &tx.vin {
                        spent.entry(input.prev_txid.clone()).or_default().push(input.vout_index);
                    }
                }
            }
        }
        Ok(unspent)
    }

    /// Fallback spend selection used when the UTXO index is stale:
    /// full-scan `find_unspent_txo`, filtered to outputs locked to
    /// `pub_key_hash`, accumulated until `amount` is met.
    pub async fn find_spendable_outs_scan(
        &self,
        pub_key_hash: &[u8],
        amount: i64,
    ) -> Result<(i64, Vec<(Vec<u8>, i64)>)> {
        let unspent = self.find_unspent_txo().await?;
        let mut accumulated = 0i64;
        let mut selected = vec![];
        'outer: for (txid, outs) in unspent {
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

    /// Sums every unspent output locked to `pub_key_hash`, via full scan.
    pub async fn balance_scan(&self, pub_key_hash: &[u8]) -> Result<i64> {
        let unspent = self.find_unspent_txo().await?;
        Ok(unspent
            .values()
            .flatten()
            .filter(|out| out.is_locked_with_key(pub_key_hash))
            .map(|out| out.value)
            .sum())
    }

    /// Builds, signs, and returns a spending transaction: prefers the
    /// UTXO index when it is fresh, falling back to a full scan
    /// otherwise.
    pub async fn new_utxo_tx(
        &self,
        wallets: &Wallets,
        from: &str,
        to: &str,
        amount: i64,
    ) -> Result<Transaction> {
        let wallet = wallets
            .get_wallet(from)
            .ok_or_else(|| LedgerError::InvalidAddress(format!("no wallet for {from}")))?;
        let pub_key_hash = crypto::hash_pub_key(wallet.get_public_key());

        let utxo_set = UTXOSet::new(&self.store);
        let (accumulated, selected) = if utxo_set.is_actual(self).await? {
            utxo_set.find_spendable(&pub_key_hash, amount).await?
        } else {
            warn!("utxo index is stale, falling back to full chain scan");
            self.find_spendable_outs_scan(&pub_key_hash, amount).await?
        };

        if accumulated < amount {
            return Err(LedgerError::InsufficientFunds {
                have: accumulated,
                need: amount,
            });
        }

        let mut tx = Transaction::new_utxo_transaction(
            wallet.get_public_key(),
            to,
            from,
            amount,
            accumulated,
            selected,
        )?;
        self.sign(&mut tx, wallet.get_pkcs8()).await?;
        Ok(tx)
    }
}

/// A lazy, tip-to-genesis sequence of blocks. Each call to `next`
/// performs one synchronous store read; the sequence owns only its
/// current cursor hash.
pub struct ChainIter {
    store: Store,
    next_hash: Option<Vec<u8>>,
}

impl ChainIter {
    pub fn next(&mut self) -> Option<Block> {
        let hash = self.next_hash.take()?;
        let block = self.store.get_block_sync(&hash).ok()??;
        self.next_hash = if block.is_genesis() {
            None
        } else {
            Some(block.prev_hash.clone())
        };
        Some(block)
    }
}

fn hex(bytes: &[u8]) -> String {
    data_encoding::HEXLOWER.encode(bytes)
}
