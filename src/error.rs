//! Crate-wide error type: one `thiserror::Error` enum, variants grouped
//! by doc-comment headers, string-carrying rather than wrapping the
//! foreign error type directly so the enum stays `Clone` (neither
//! `sled::Error` nor `ring`'s error types are `Clone`).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Clone, Error, Debug)]
pub enum LedgerError {
    // Address & keystore
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    // Transaction
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("insufficient funds: have {have}, need {need}")]
    InsufficientFunds { have: i64, need: i64 },

    // Store / persistence
    #[error("store error: {0}")]
    StoreError(String),

    #[error("decode error: {0}")]
    DecodeError(String),

    // Cryptography
    #[error("crypto error: {0}")]
    CryptoError(String),

    // Lookup
    #[error("not found: {0}")]
    NotFound(String),

    // UTXO index freshness
    #[error("utxo index is stale")]
    Stale,
}

impl From<sled::Error> for LedgerError {
    fn from(e: sled::Error) -> Self {
        LedgerError::StoreError(e.to_string())
    }
}

impl From<sled::transaction::TransactionError<LedgerError>> for LedgerError {
    fn from(e: sled::transaction::TransactionError<LedgerError>) -> Self {
        match e {
            sled::transaction::TransactionError::Abort(inner) => inner,
            sled::transaction::TransactionError::Storage(e) => LedgerError::StoreError(e.to_string()),
        }
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(e: std::io::Error) -> Self {
        LedgerError::StoreError(e.to_string())
    }
}

impl From<bincode::error::EncodeError> for LedgerError {
    fn from(e: bincode::error::EncodeError) -> Self {
        LedgerError::DecodeError(e.to_string())
    }
}

impl From<bincode::error::DecodeError> for LedgerError {
    fn from(e: bincode::error::DecodeError) -> Self {
        LedgerError::DecodeError(e.to_string())
    }
}

impl From<bs58::decode::Error> for LedgerError {
    fn from(e: bs58::decode::Error) -> Self {
        LedgerError::InvalidAddress(e.to_string())
    }
}
