// Declares and re-exports the ledger engine's modules.
pub mod block;
pub mod blockchain;
pub mod proof_of_work;
pub mod transaction;
pub mod utxo_set;

pub use block::Block;
pub use blockchain::{Chain, ChainIter};
pub use proof_of_work::{BATCH_SIZE, meets_target, mine, target};
pub use transaction::{TXInput, TXOutput, Transaction};
pub use utxo_set::UTXOSet;
