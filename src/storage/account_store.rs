use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::{StorageBackend, TransactionStore};
use crate::{
    errors::{LedgerError, Result},
    ledger::{BudgetMap, SavingsGoal, TransactionRecord, Wallet},
};

pub const DEFAULT_KEY_PREFIX: &str = "MDA_APP_";

/// The documents kept for every account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    Transactions,
    Budgets,
    Wallets,
    Goals,
}

impl DataKind {
    pub const ALL: [DataKind; 4] = [
        DataKind::Transactions,
        DataKind::Budgets,
        DataKind::Wallets,
        DataKind::Goals,
    ];

    pub fn suffix(&self) -> &'static str {
        match self {
            DataKind::Transactions => "transactions",
            DataKind::Budgets => "budgets",
            DataKind::Wallets => "wallets",
            DataKind::Goals => "goals",
        }
    }
}

/// Typed access to one account's documents on top of a [`StorageBackend`].
///
/// Keys follow `{prefix}{account}_{kind}`, so `MDA_APP_jane@example.com_wallets`.
pub struct AccountStore {
    backend: Box<dyn StorageBackend>,
    prefix: String,
}

impl AccountStore {
    pub fn new(backend: Box<dyn StorageBackend>) -> Self {
        Self::with_prefix(backend, DEFAULT_KEY_PREFIX)
    }

    pub fn with_prefix(backend: Box<dyn StorageBackend>, prefix: impl Into<String>) -> Self {
        Self {
            backend,
            prefix: prefix.into(),
        }
    }

    pub fn key(&self, account: &str, kind: DataKind) -> String {
        format!("{}{}_{}", self.prefix, account, kind.suffix())
    }

    pub fn load_wallets(&self, account: &str) -> Result<Vec<Wallet>> {
        self.load_or_default(account, DataKind::Wallets)
    }

    pub fn save_wallets(&self, account: &str, wallets: &[Wallet]) -> Result<()> {
        self.save(account, DataKind::Wallets, &wallets)
    }

    pub fn load_budgets(&self, account: &str) -> Result<BudgetMap> {
        self.load_or_default(account, DataKind::Budgets)
    }

    pub fn save_budgets(&self, account: &str, budgets: &BudgetMap) -> Result<()> {
        self.save(account, DataKind::Budgets, budgets)
    }

    pub fn load_goals(&self, account: &str) -> Result<Vec<SavingsGoal>> {
        self.load_or_default(account, DataKind::Goals)
    }

    pub fn save_goals(&self, account: &str, goals: &[SavingsGoal]) -> Result<()> {
        self.save(account, DataKind::Goals, &goals)
    }

    /// Replaces the account's transactions with the JSON array in `json`.
    /// Anything other than an array of transactions is rejected and nothing is
    /// written.
    pub fn import_transactions(&self, account: &str, json: &str) -> Result<usize> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        if !value.is_array() {
            return Err(LedgerError::InvalidInput(
                "import data must be a JSON array of transactions".into(),
            ));
        }
        let transactions: Vec<TransactionRecord> = serde_json::from_value(value)?;
        self.save_transactions(account, &transactions)?;
        Ok(transactions.len())
    }

    /// Serializes the account's transactions the way they are stored.
    pub fn export_transactions(&self, account: &str) -> Result<String> {
        let transactions = self.load_transactions(account)?;
        Ok(serde_json::to_string_pretty(&transactions)?)
    }

    /// Removes every document of the account.
    pub fn clear(&self, account: &str) -> Result<()> {
        for kind in DataKind::ALL {
            self.backend.remove(&self.key(account, kind))?;
        }
        debug!(account, "cleared account data");
        Ok(())
    }

    fn load_or_default<T>(&self, account: &str, kind: DataKind) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        let key = self.key(account, kind);
        match self.backend.read(&key)? {
            Some(data) => serde_json::from_str(&data).map_err(|err| {
                warn!(key = %key, error = %err, "stored document is not valid JSON");
                LedgerError::from(err)
            }),
            None => Ok(T::default()),
        }
    }

    fn save<T>(&self, account: &str, kind: DataKind, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let key = self.key(account, kind);
        let json = serde_json::to_string_pretty(value)?;
        self.backend.write(&key, &json)
    }
}

impl TransactionStore for AccountStore {
    fn load_transactions(&self, account: &str) -> Result<Vec<TransactionRecord>> {
        self.load_or_default(account, DataKind::Transactions)
    }

    fn save_transactions(&self, account: &str, transactions: &[TransactionRecord]) -> Result<()> {
        self.save(account, DataKind::Transactions, transactions)
    }
}
