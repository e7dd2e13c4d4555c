//! Integration scenarios that need a live store, split out from
//! `test_helpers` below. Unit-level invariants (codec round trips, PoW
//! determinism, address checksums, signature malleability) are covered
//! beside the code they test; this file covers the full-chain behavior
//! that needs a `Store` on disk.


use assert_cmd::cargo::CommandCargoExt;
use blockchain::{Chain, LedgerError, Transaction, UTXOSet};
use std::process::Command;
use tempfile::TempDir;
use test_helpers::*;

/// S1, genesis balance: a freshly bootstrapped chain pays the reward to
/// the address it was opened with, and nothing else.
#[tokio::test]
async fn s1_genesis_balance() {
    let dir = TempDir::new().unwrap();
    let config = temp_config(&dir);
    let mut wallets = create_test_wallets(&config);
    let address = wallets.create_wallet(&config).unwrap();

    let chain = create_temp_blockchain(&config, &address).await;

    let pub_key_hash = blockchain::crypto::extract_pub_key_hash(&address).unwrap();
    assert_eq!(chain.balance_scan(&pub_key_hash).await.unwrap(), 50);

    let mut iter = chain.iterator().await.unwrap();
    let block = iter.next().unwrap();
    assert!(iter.next().is_none(), "chain should be exactly one block long");
    assert_eq!(block.transactions.len(), 1);
    assert!(block.transactions[0].is_coinbase());
    assert_eq!(block.transactions[0].vout[0].value, 50);
    assert_eq!(block.transactions[0].vout[0].pub_key_hash, pub_key_hash);
}

/// S2, simple transfer: sending part of the genesis reward mines a
/// second block with a fresh coinbase for the sender plus the spend, and
/// balances land where expected.
#[tokio::test]
async fn s2_simple_transfer() {
    let dir = TempDir::new().unwrap();
    let config = temp_config(&dir);
    let mut wallets = create_test_wallets(&config);
    let a = wallets.create_wallet(&config).unwrap();
    let b = wallets.create_wallet(&config).unwrap();

    let chain = create_temp_blockchain(&config, &a).await;

    let spend = chain.new_utxo_tx(&wallets, &a, &b, 30).await.unwrap();
    let reward = Transaction::new_coinbase(&a, b"reward").unwrap();
    let block = chain.mine_block(&[reward, spend]).await.unwrap();

    assert_eq!(block.transactions.len(), 2);
    assert!(block.transactions[0].is_coinbase());
    assert!(!block.transactions[1].is_coinbase());
    assert_eq!(block.transactions[1].vin.len(), 1);
    assert_eq!(block.transactions[1].vout.len(), 2);

    let a_hash = blockchain::crypto::extract_pub_key_hash(&a).unwrap();
    let b_hash = blockchain::crypto::extract_pub_key_hash(&b).unwrap();
    assert_eq!(chain.balance_scan(&a_hash).await.unwrap(), 70);
    assert_eq!(chain.balance_scan(&b_hash).await.unwrap(), 30);
}

/// S3, insufficient funds: an empty wallet cannot build a spend, and the
/// chain is left unchanged.
#[tokio::test]
async fn s3_insufficient_funds() {
    let dir = TempDir::new().unwrap();
    let config = temp_config(&dir);
    let mut wallets = create_test_wallets(&config);
    let rich = wallets.create_wallet(&config).unwrap();
    let poor = wallets.create_wallet(&config).unwrap();

    let chain = create_temp_blockchain(&config, &rich).await;
    let tip_before = chain.tip().await.unwrap();

    let err = chain.new_utxo_tx(&wallets, &poor, &rich, 1).await.unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFunds { have: 0, need: 1 }));

    assert_eq!(chain.tip().await.unwrap(), tip_before, "chain must be unchanged");
}

/// S4, tamper detection: flipping a bit of a signed transaction's output
/// value breaks verification, and mining it is rejected outright.
#[tokio::test]
async fn s4_tamper_detection() {
    let dir = TempDir::new().unwrap();
    let config = temp_config(&dir);
    let mut wallets = create_test_wallets(&config);
    let a = wallets.create_wallet(&config).unwrap();
    let b = wallets.create_wallet(&config).unwrap();

    let chain = create_temp_blockchain(&config, &a).await;
    let mut spend = chain.new_utxo_tx(&wallets, &a, &b, 30).await.unwrap();
    spend.vout[0].value ^= 1;

    let err = chain.mine_block(&[spend]).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidTransaction(_)));
}

/// S5, UTXO incremental vs scan: after a couple of sends, the
/// incrementally updated index matches a fresh reindex entry-for-entry.
#[tokio::test]
async fn s5_incremental_matches_reindex() {
    let dir = TempDir::new().unwrap();
    let config = temp_config(&dir);
    let mut wallets = create_test_wallets(&config);
    let a = wallets.create_wallet(&config).unwrap();
    let b = wallets.create_wallet(&config).unwrap();

    let chain = create_temp_blockchain(&config, &a).await;
    let tx1 = chain.new_utxo_tx(&wallets, &a, &b, 10).await.unwrap();
    chain.mine_block(&[tx1]).await.unwrap();

    let utxo_set = UTXOSet::new(chain.store());
    assert!(utxo_set.is_actual(&chain).await.unwrap());

    let incremental = all_utxo_entries(&chain).await;

    utxo_set.reindex(&chain).await.unwrap();
    let reindexed = all_utxo_entries(&chain).await;

    assert_eq!(incremental, reindexed);
}

async fn all_utxo_entries(chain: &Chain) -> Vec<(Vec<u8>, Vec<u8>)> {
    let mut entries = chain.store().utxo_entries().await.unwrap();
    entries.sort();
    entries
}

/// S6, address checksum: flipping one character of a valid address
/// breaks checksum validation.
#[test]
fn s6_address_checksum() {
    let wallet = blockchain::Wallet::new().unwrap();
    let address = wallet.get_address().unwrap();
    assert!(blockchain::crypto::validate_address(&address).unwrap());

    let mut bytes = address.into_bytes();
    let last = bytes.len() - 1;
    bytes[last] = if bytes[last] == b'1' { b'2' } else { b'1' };
    let tampered = String::from_utf8(bytes).unwrap();

    assert!(!blockchain::crypto::validate_address(&tampered).unwrap_or(false));
}

/// Invariant 3: reindexing from a fresh genesis through a couple of
/// mined blocks produces the same balance a full-scan `find_unspent_txo`
/// would, for every address involved.
#[tokio::test]
async fn reindexed_balance_matches_full_scan_for_every_address() {
    let dir = TempDir::new().unwrap();
    let config = temp_config(&dir);
    let mut wallets = create_test_wallets(&config);
    let a = wallets.create_wallet(&config).unwrap();
    let b = wallets.create_wallet(&config).unwrap();
    let c = wallets.create_wallet(&config).unwrap();

    let chain = create_temp_blockchain(&config, &a).await;
    let tx1 = chain.new_utxo_tx(&wallets, &a, &b, 15).await.unwrap();
    chain.mine_block(&[tx1]).await.unwrap();
    let tx2 = chain.new_utxo_tx(&wallets, &b, &c, 5).await.unwrap();
    chain.mine_block(&[tx2]).await.unwrap();

    let utxo_set = UTXOSet::new(chain.store());
    utxo_set.reindex(&chain).await.unwrap();

    for addr in [&a, &b, &c] {
        let pub_key_hash = blockchain::crypto::extract_pub_key_hash(addr).unwrap();
        let scanned = chain.balance_scan(&pub_key_hash).await.unwrap();
        let (indexed, _) = utxo_set.find_spendable(&pub_key_hash, i64::MAX).await.unwrap();
        assert_eq!(scanned, indexed, "balance mismatch for {addr}");
    }
}

/// The index falls back to a full chain scan when it is stale (e.g. a
/// block was mined through a second `Chain` handle on the same store
/// without going through this process's `UTXOSet`).
#[tokio::test]
async fn stale_index_does_not_stop_sends() {
    let dir = TempDir::new().unwrap();
    let config = temp_config(&dir);
    let mut wallets = create_test_wallets(&config);
    let a = wallets.create_wallet(&config).unwrap();
    let b = wallets.create_wallet(&config).unwrap();

    let chain = create_temp_blockchain(&config, &a).await;
    let tx = chain.new_utxo_tx(&wallets, &a, &b, 10).await.unwrap();
    chain.mine_block(&[tx]).await.unwrap();

    let utxo_set = UTXOSet::new(chain.store());
    assert!(utxo_set.is_actual(&chain).await.unwrap());

    // Mine another block directly via Chain, bypassing UTXOSet, to make the
    // index stale relative to the new tip.
    let reward = create_coinbase_transaction(&a);
    chain.mine_block(&[reward]).await.unwrap();
    assert!(!utxo_set.is_actual(&chain).await.unwrap());

    // A further send must still succeed via the scan fallback.
    let tx2 = chain.new_utxo_tx(&wallets, &a, &b, 5).await.unwrap();
    chain.mine_block(&[tx2]).await.unwrap();

    let b_hash = blockchain::crypto::extract_pub_key_hash(&b).unwrap();
    assert_eq!(chain.balance_scan(&b_hash).await.unwrap(), 15);
}

/// An empty-address chain is read-only: iteration is a no-op and no
/// genesis block is ever mined.
#[tokio::test]
async fn empty_address_opens_read_only_chain() {
    let dir = TempDir::new().unwrap();
    let config = temp_config(&dir);
    let chain = open_read_only_chain(&config).await;
    assert!(chain.tip().await.unwrap().is_none());
    let mut iter = chain.iterator().await.unwrap();
    assert!(iter.next().is_none());
}

// --- CLI end-to-end scenarios (assert_cmd over the compiled binary) ---

fn blockchain_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("blockchain").expect("find compiled binary");
    cmd.current_dir(dir.path());
    cmd
}

fn created_address(dir: &TempDir) -> String {
    let output = blockchain_cmd(dir)
        .arg("createwallet")
        .output()
        .expect("run createwallet");
    assert!(output.status.success());
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .find_map(|line| line.strip_prefix("Your new address: "))
        .expect("createwallet prints the new address")
        .trim()
        .to_string()
}

#[test]
fn cli_createwallet_then_printwallets_shows_new_address() {
    let dir = TempDir::new().unwrap();
    let address = created_address(&dir);

    let output = blockchain_cmd(&dir)
        .arg("printwallets")
        .output()
        .expect("run printwallets");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains(&address));
}

#[test]
fn cli_send_with_insufficient_funds_exits_nonzero() {
    let dir = TempDir::new().unwrap();
    let rich = created_address(&dir);
    let poor = created_address(&dir);

    // Bootstraps the chain: genesis pays the reward to `rich`, then 10
    // spends to `poor`.
    let seed = blockchain_cmd(&dir)
        .args(["send", "-f", &rich, "-t", &poor, "-a", "10"])
        .output()
        .expect("run seed send");
    assert!(seed.status.success());

    // The chain is already initialized, so opening it with `poor` does not
    // bootstrap a second genesis; `poor` only has the 10 it was just sent.
    let output = blockchain_cmd(&dir)
        .args(["send", "-f", &poor, "-t", &rich, "-a", "1000"])
        .output()
        .expect("run send");
    assert!(!output.status.success());
}
