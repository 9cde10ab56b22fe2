pub mod account_store;
pub mod json_backend;
pub mod memory;

use crate::{errors::Result, ledger::TransactionRecord};

/// Raw key-value persistence, the equivalent of browser local storage or a
/// directory of JSON documents.
pub trait StorageBackend: Send + Sync {
    /// Returns the stored document, or `None` when the key was never written.
    fn read(&self, key: &str) -> Result<Option<String>>;
    fn write(&self, key: &str, data: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Loads and saves the full transaction list of one account.
pub trait TransactionStore: Send + Sync {
    fn load_transactions(&self, account: &str) -> Result<Vec<TransactionRecord>>;
    fn save_transactions(&self, account: &str, transactions: &[TransactionRecord]) -> Result<()>;
}

pub use account_store::{AccountStore, DataKind, DEFAULT_KEY_PREFIX};
pub use json_backend::JsonStorage;
pub use memory::MemoryStorage;
