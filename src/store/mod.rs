//! Persistence: a `sled` keyspace holding blocks by hash and a "last
//! block hash" marker, plus the UTXO set's own reindexed entries.
//!
//! Wraps the synchronous `sled::Db` behind `async fn`s that run the
//! blocking call on `spawn_blocking`, and caches the current tip in an
//! `Arc<tokio::sync::RwLock<...>>` so hot-path reads (`get_last`) don't
//! round-trip the database. Block keys are the raw hash bytes, since the
//! binary `Block` has no need of a human-readable key for its iterator.

use crate::core::block::Block;
use crate::error::Result;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, trace};

const BLOCKS_TREE: &str = "blocks";
const UTXO_TREE: &str = "utxo";
const LAST_BLOCK_KEY: &[u8] = b"l";
const UTXO_REINDEX_MARKER: &[u8] = b"reindexed_for";

#[derive(Clone)]
pub struct Store {
    db: sled::Db,
    tip_cache: Arc<RwLock<Option<Vec<u8>>>>,
}

impl Store {
    /// Opens (creating if absent) the `sled` database rooted at `path`.
    pub async fn open(path: &Path) -> Result<Store> {
        let path = path.to_path_buf();
        let db = tokio::task::spawn_blocking(move || sled::open(path))
            .await
            .expect("store open task panicked")?;

        let tip = {
            let blocks = db.open_tree(BLOCKS_TREE)?;
            blocks.get(LAST_BLOCK_KEY)?.map(|ivec| ivec.to_vec())
        };

        Ok(Store {
            db,
            tip_cache: Arc::new(RwLock::new(tip)),
        })
    }

    fn blocks(&self) -> Result<sled::Tree> {
        Ok(self.db.open_tree(BLOCKS_TREE)?)
    }

    fn utxo(&self) -> Result<sled::Tree> {
        Ok(self.db.open_tree(UTXO_TREE)?)
    }

    /// Persists `block` keyed by its own hash.
    pub async fn put_block(&self, block: &Block) -> Result<()> {
        let blocks = self.blocks()?;
        let key = block.hash.clone();
        let value = block.serialize()?;
        debug!(hash = %hex(&key), "put block");
        tokio::task::spawn_blocking(move || blocks.insert(key, value))
            .await
            .expect("store task panicked")?;
        Ok(())
    }

    /// Looks up a block by hash.
    pub async fn get_block(&self, hash: &[u8]) -> Result<Option<Block>> {
        let blocks = self.blocks()?;
        let key = hash.to_vec();
        trace!(hash = %hex(&key), "get block");
        let raw = tokio::task::spawn_blocking(move || blocks.get(key))
            .await
            .expect("store task panicked")?;
        raw.map(|ivec| Block::deserialize(&ivec)).transpose()
    }

    /// Synchronous lookup, used by the restartable chain iterator
    /// (`core::blockchain::ChainIter`) so stepping through blocks doesn't
    /// need an async context.
    pub fn get_block_sync(&self, hash: &[u8]) -> Result<Option<Block>> {
        let blocks = self.blocks()?;
        let raw = blocks.get(hash)?;
        raw.map(|ivec| Block::deserialize(&ivec)).transpose()
    }

    /// The current tip hash, served from the in-memory cache.
    pub async fn get_last(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.tip_cache.read().await.clone())
    }

    /// Advances the tip: persists the marker, then updates the cache.
    pub async fn set_last(&self, hash: &[u8]) -> Result<()> {
        let blocks = self.blocks()?;
        let value = hash.to_vec();
        let for_db = value.clone();
        debug!(hash = %hex(&value), "advanced tip");
        tokio::task::spawn_blocking(move || blocks.insert(LAST_BLOCK_KEY, for_db))
            .await
            .expect("store task panicked")?;
        *self.tip_cache.write().await = Some(value);
        Ok(())
    }

    /// Replaces the entire UTXO index with `entries`: clears the tree,
    /// inserts every `(txid, encoded outputs)` pair, and stamps the tip
    /// hash the index was built against.
    pub async fn reindex_utxo(
        &self,
        entries: Vec<(Vec<u8>, Vec<u8>)>,
        built_at_tip: Vec<u8>,
    ) -> Result<()> {
        let utxo = self.utxo()?;
        debug!(entries = entries.len(), tip = %hex(&built_at_tip), "reindexed utxo tree");
        tokio::task::spawn_blocking(move || -> Result<()> {
            utxo.clear()?;
            for (key, value) in entries {
                utxo.insert(key, value)?;
            }
            utxo.insert(UTXO_REINDEX_MARKER, built_at_tip)?;
            Ok(())
        })
        .await
        .expect("store task panicked")
    }

    /// A single entry's encoded outputs, if indexed.
    pub async fn utxo_entries_for(&self, txid: &[u8]) -> Result<Option<Vec<u8>>> {
        let utxo = self.utxo()?;
        let key = txid.to_vec();
        let raw = tokio::task::spawn_blocking(move || utxo.get(key))
            .await
            .expect("store task panicked")?;
        Ok(raw.map(|ivec| ivec.to_vec()))
    }

    /// Every `(txid, encoded outputs)` pair currently in the index.
    pub async fn utxo_entries(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let utxo = self.utxo()?;
        tokio::task::spawn_blocking(move || -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
            utxo.iter()
                .filter(|entry| {
                    entry
                        .as_ref()
                        .map(|(k, _)| k.as_ref() != UTXO_REINDEX_MARKER)
                        .unwrap_or(true)
                })
                .map(|entry| {
                    let (k, v) = entry?;
                    Ok((k.to_vec(), v.to_vec()))
                })
                .collect()
        })
        .await
        .expect("store task panicked")
    }

    /// Replaces `txid`'s entry in the UTXO index, or removes it if
    /// `outputs` is empty (all outputs spent).
    pub async fn set_utxo_entry(&self, txid: Vec<u8>, outputs: Option<Vec<u8>>) -> Result<()> {
        let utxo = self.utxo()?;
        trace!(txid = %hex(&txid), spent = outputs.is_none(), "wrote utxo entry");
        tokio::task::spawn_blocking(move || -> Result<()> {
            match outputs {
                Some(bytes) => {
                    utxo.insert(txid, bytes)?;
                }
                None => {
                    utxo.remove(txid)?;
                }
            }
            Ok(())
        })
        .await
        .expect("store task panicked")
    }

    /// Stamps the tip hash the UTXO index was last updated against,
    /// without touching any entry. Used after an incremental update
    /// (as opposed to `reindex_utxo`'s full rebuild) to keep the index's
    /// freshness marker in step with the chain.
    pub async fn set_last_utxo_tip(&self, hash: &[u8]) -> Result<()> {
        let utxo = self.utxo()?;
        let value = hash.to_vec();
        tokio::task::spawn_blocking(move || utxo.insert(UTXO_REINDEX_MARKER, value))
            .await
            .expect("store task panicked")?;
        Ok(())
    }

    /// The tip hash the UTXO index was last rebuilt against, if any.
    pub async fn utxo_reindexed_at(&self) -> Result<Option<Vec<u8>>> {
        let utxo = self.utxo()?;
        let raw = tokio::task::spawn_blocking(move || utxo.get(UTXO_REINDEX_MARKER))
            .await
            .expect("store task panicked")?;
        Ok(raw.map(|ivec| ivec.to_vec()))
    }
}

fn hex(bytes: &[u8]) -> String {
    data_encoding::HEXLOWER.encode(bytes)
}
