use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{info, warn};

use super::{clock::Clock, ids::IdGenerator};
use crate::{
    errors::{LedgerError, Result},
    ledger::{
        format_date, materialize, snapshot_templates, summary, BudgetMap, BudgetUsage,
        Occurrence, Recurrence, RecurrenceSnapshot, RecurringTemplate, SavingsGoal,
        SkippedTemplate, Stats, TransactionBody, TransactionRecord, Wallet, WalletKind,
    },
    storage::{AccountStore, TransactionStore},
};

const DEFAULT_WALLET_NAME: &str = "Cash";
const DEFAULT_WALLET_COLOR: &str = "#3b82f6";
const SAVINGS_CATEGORY: &str = "Savings";

/// Result of loading an account and catching up its recurring templates.
#[derive(Debug)]
pub struct SessionLoad {
    pub reference_date: NaiveDate,
    pub generated: usize,
    pub skipped: Vec<SkippedTemplate>,
    /// `true` when the materialized transactions were written back.
    pub persisted: bool,
    /// Set when writing the materialized transactions failed. The session
    /// still holds them; call [`AccountSession::persist`] to retry.
    pub persist_error: Option<LedgerError>,
}

/// One account's data held in memory between a load and the saves that
/// follow each change.
pub struct AccountSession {
    account: String,
    store: AccountStore,
    clock: Box<dyn Clock>,
    ids: Box<dyn IdGenerator>,
    transactions: Vec<TransactionRecord>,
    wallets: Vec<Wallet>,
    budgets: BudgetMap,
    goals: Vec<SavingsGoal>,
    unsaved: bool,
    wallets_unsaved: bool,
}

impl AccountSession {
    /// Loads the account and materializes every recurring template due on
    /// the clock's current day. An account without wallets first gets a
    /// default "Cash" wallet that takes over every transaction lacking one.
    /// The result is written back only when something changed.
    pub fn open(
        store: AccountStore,
        account: impl Into<String>,
        clock: Box<dyn Clock>,
        ids: Box<dyn IdGenerator>,
    ) -> Result<(Self, SessionLoad)> {
        let account = account.into();
        let transactions = store.load_transactions(&account)?;
        let wallets = store.load_wallets(&account)?;
        let budgets = store.load_budgets(&account)?;
        let goals = store.load_goals(&account)?;
        let mut session = Self {
            account,
            store,
            clock,
            ids,
            transactions,
            wallets,
            budgets,
            goals,
            unsaved: false,
            wallets_unsaved: false,
        };
        session.ensure_default_wallet();
        let report = session.process_recurring();
        Ok((session, report))
    }

    /// Runs the materializer against today's date and persists when anything
    /// was generated or is still unsaved. Safe to call repeatedly.
    pub fn process_recurring(&mut self) -> SessionLoad {
        let reference_date = self.clock.today();
        let outcome = materialize(
            reference_date,
            std::mem::take(&mut self.transactions),
            self.ids.as_ref(),
        );
        self.transactions = outcome.transactions;
        let mut report = SessionLoad {
            reference_date,
            generated: outcome.generated,
            skipped: outcome.skipped,
            persisted: false,
            persist_error: None,
        };
        if outcome.generated > 0 {
            self.unsaved = true;
        }
        if self.has_unsaved_changes() {
            match self.persist() {
                Ok(()) => report.persisted = true,
                Err(err) => {
                    warn!(account = %self.account, error = %err, "failed to save materialized transactions");
                    report.persist_error = Some(err);
                }
            }
        }
        info!(
            account = %self.account,
            reference = %format_date(reference_date),
            generated = report.generated,
            skipped = report.skipped.len(),
            "processed recurring transactions"
        );
        report
    }

    /// Writes the wallets and the transaction list if they have changes not
    /// yet stored.
    pub fn persist(&mut self) -> Result<()> {
        if self.wallets_unsaved {
            self.store.save_wallets(&self.account, &self.wallets)?;
            self.wallets_unsaved = false;
        }
        if self.unsaved {
            self.store
                .save_transactions(&self.account, &self.transactions)?;
            self.unsaved = false;
        }
        Ok(())
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved || self.wallets_unsaved
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn transactions(&self) -> &[TransactionRecord] {
        &self.transactions
    }

    pub fn wallets(&self) -> &[Wallet] {
        &self.wallets
    }

    pub fn budgets(&self) -> &BudgetMap {
        &self.budgets
    }

    pub fn goals(&self) -> &[SavingsGoal] {
        &self.goals
    }

    /// Records a new transaction. With a recurrence it becomes a template
    /// whose occurrences start one period after `date`.
    pub fn add_transaction(
        &mut self,
        date: NaiveDate,
        body: TransactionBody,
        recurrence: Option<Recurrence>,
    ) -> Result<String> {
        body.validate()?;
        if let Some(target) = body.transfer_to_wallet_id.as_deref() {
            self.require_wallet(target)?;
        }
        self.require_wallet(&body.wallet_id)?;
        let id = self.ids.new_id();
        let record = match recurrence {
            Some(recurrence) => {
                TransactionRecord::from(RecurringTemplate::new(id.clone(), date, body, recurrence))
            }
            None => TransactionRecord::from(Occurrence {
                id: id.clone(),
                date,
                body,
            }),
        };
        self.transactions.push(record);
        self.unsaved = true;
        self.persist()?;
        Ok(id)
    }

    /// Replaces a transaction in place, keeping its id. A template that stays
    /// recurring keeps its watermark so past occurrences are not generated
    /// again.
    pub fn update_transaction(
        &mut self,
        id: &str,
        date: NaiveDate,
        body: TransactionBody,
        recurrence: Option<Recurrence>,
    ) -> Result<()> {
        body.validate()?;
        if let Some(target) = body.transfer_to_wallet_id.as_deref() {
            self.require_wallet(target)?;
        }
        self.require_wallet(&body.wallet_id)?;
        let index = self
            .transactions
            .iter()
            .position(|txn| txn.id == id)
            .ok_or_else(|| LedgerError::NotFound(format!("transaction {id}")))?;
        let previous = &self.transactions[index];
        let record = match recurrence {
            Some(recurrence) => {
                let mut record = TransactionRecord::from(RecurringTemplate::new(
                    id, date, body, recurrence,
                ));
                if previous.is_template() {
                    record.last_processed_date = previous.last_processed_date.clone();
                }
                record
            }
            None => TransactionRecord::from(Occurrence {
                id: id.to_string(),
                date,
                body,
            }),
        };
        self.transactions[index] = record;
        self.unsaved = true;
        self.persist()
    }

    /// Deletes a transaction or template. Occurrences already generated by a
    /// removed template stay in place.
    pub fn remove_transaction(&mut self, id: &str) -> Result<()> {
        let before = self.transactions.len();
        self.transactions.retain(|txn| txn.id != id);
        if self.transactions.len() == before {
            return Err(LedgerError::NotFound(format!("transaction {id}")));
        }
        self.unsaved = true;
        self.persist()
    }

    pub fn add_wallet(&mut self, wallet: Wallet) -> Result<()> {
        if self.wallets.iter().any(|existing| existing.id == wallet.id) {
            return Err(LedgerError::InvalidInput(format!(
                "wallet {} already exists",
                wallet.id
            )));
        }
        self.wallets.push(wallet);
        self.wallets_unsaved = true;
        self.persist()
    }

    /// Replaces the wallet with the same id.
    pub fn update_wallet(&mut self, wallet: Wallet) -> Result<()> {
        let existing = self
            .wallets
            .iter_mut()
            .find(|existing| existing.id == wallet.id)
            .ok_or_else(|| LedgerError::NotFound(format!("wallet {}", wallet.id)))?;
        *existing = wallet;
        self.wallets_unsaved = true;
        self.persist()
    }

    /// Deletes a wallet. The last wallet and wallets still referenced by a
    /// transaction, as source or transfer target, cannot be deleted.
    pub fn remove_wallet(&mut self, wallet_id: &str) -> Result<()> {
        self.require_wallet(wallet_id)?;
        if self.wallets.len() == 1 {
            return Err(LedgerError::InvalidInput(
                "an account must keep at least one wallet".into(),
            ));
        }
        let in_use = self.transactions.iter().any(|txn| {
            txn.wallet_id == wallet_id
                || txn.transfer_to_wallet_id.as_deref() == Some(wallet_id)
        });
        if in_use {
            return Err(LedgerError::InvalidInput(format!(
                "wallet {wallet_id} still has transactions"
            )));
        }
        self.wallets.retain(|wallet| wallet.id != wallet_id);
        self.wallets_unsaved = true;
        self.persist()
    }

    /// Sets the monthly limit of a category; a limit of zero removes it.
    pub fn set_budget(&mut self, category: impl Into<String>, limit: f64) -> Result<()> {
        if !limit.is_finite() || limit < 0.0 {
            return Err(LedgerError::InvalidInput(format!(
                "budget limit must be a non-negative number, got {limit}"
            )));
        }
        let category = category.into();
        if limit == 0.0 {
            self.budgets.remove(&category);
        } else {
            self.budgets.insert(category, limit);
        }
        self.store.save_budgets(&self.account, &self.budgets)
    }

    pub fn save_goal(&mut self, goal: SavingsGoal) -> Result<()> {
        match self.goals.iter_mut().find(|existing| existing.id == goal.id) {
            Some(existing) => *existing = goal,
            None => self.goals.push(goal),
        }
        self.store.save_goals(&self.account, &self.goals)
    }

    /// Moves money from a wallet into a savings goal: records a `Savings`
    /// expense dated today and raises the goal's current amount. Returns the
    /// id of the new transaction.
    pub fn deposit_to_goal(
        &mut self,
        goal_id: &str,
        wallet_id: &str,
        amount: f64,
    ) -> Result<String> {
        let goal_index = self
            .goals
            .iter()
            .position(|goal| goal.id == goal_id)
            .ok_or_else(|| LedgerError::NotFound(format!("goal {goal_id}")))?;
        let body = TransactionBody::expense(
            wallet_id,
            amount,
            SAVINGS_CATEGORY,
            format!("Deposit to Goal: {}", self.goals[goal_index].name),
        );
        body.validate()?;
        self.require_wallet(wallet_id)?;

        let id = self.ids.new_id();
        self.transactions.push(TransactionRecord::from(Occurrence {
            id: id.clone(),
            date: self.clock.today(),
            body,
        }));
        self.unsaved = true;
        self.goals[goal_index].current_amount += amount;
        self.persist()?;
        self.store.save_goals(&self.account, &self.goals)?;
        info!(account = %self.account, goal = goal_id, amount, "deposited to savings goal");
        Ok(id)
    }

    pub fn wallet_balances(&self) -> BTreeMap<String, f64> {
        summary::wallet_balances(&self.wallets, &self.transactions)
    }

    pub fn stats(&self) -> Stats {
        summary::stats(&self.wallets, &self.transactions)
    }

    pub fn budget_usage(&self, year: i32, month: u32) -> Vec<BudgetUsage> {
        summary::budget_usage(&self.budgets, &self.transactions, year, month)
    }

    pub fn recurrence_snapshots(&self) -> Vec<RecurrenceSnapshot> {
        snapshot_templates(&self.transactions, self.clock.today())
    }

    /// Replaces the stored transactions with an imported JSON array and
    /// reprocesses recurring templates.
    pub fn import_json(&mut self, json: &str) -> Result<SessionLoad> {
        let count = self.store.import_transactions(&self.account, json)?;
        self.transactions = self.store.load_transactions(&self.account)?;
        self.unsaved = false;
        info!(account = %self.account, count, "imported transactions");
        Ok(self.process_recurring())
    }

    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.transactions)?)
    }

    /// Deletes every stored document of the account.
    pub fn clear(&mut self) -> Result<()> {
        self.store.clear(&self.account)?;
        self.transactions.clear();
        self.wallets.clear();
        self.budgets.clear();
        self.goals.clear();
        self.unsaved = false;
        self.wallets_unsaved = false;
        Ok(())
    }

    fn ensure_default_wallet(&mut self) {
        if !self.wallets.is_empty() {
            return;
        }
        let mut wallet = Wallet::new(self.ids.new_id(), DEFAULT_WALLET_NAME, WalletKind::Cash);
        wallet.color = DEFAULT_WALLET_COLOR.into();
        let mut adopted = 0usize;
        for txn in self
            .transactions
            .iter_mut()
            .filter(|txn| txn.wallet_id.is_empty())
        {
            txn.wallet_id = wallet.id.clone();
            adopted += 1;
        }
        info!(account = %self.account, wallet = %wallet.id, adopted, "created default wallet");
        self.wallets.push(wallet);
        self.wallets_unsaved = true;
        if adopted > 0 {
            self.unsaved = true;
        }
    }

    fn require_wallet(&self, wallet_id: &str) -> Result<()> {
        if self.wallets.iter().any(|wallet| wallet.id == wallet_id) {
            Ok(())
        } else {
            Err(LedgerError::NotFound(format!("wallet {wallet_id}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::{clock::FixedClock, ids::SequentialIds},
        ledger::TransactionKind,
        storage::{JsonStorage, MemoryStorage},
    };
    use tempfile::TempDir;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn open(today: NaiveDate) -> AccountSession {
        let store = AccountStore::new(Box::new(MemoryStorage::new()));
        let (mut session, report) = AccountSession::open(
            store,
            "jane@example.com",
            Box::new(FixedClock::new(today)),
            Box::new(SequentialIds::new("id")),
        )
        .unwrap();
        assert_eq!(report.generated, 0);
        session
            .add_wallet(Wallet::new("cash", "Cash", WalletKind::Cash))
            .unwrap();
        session
    }

    #[test]
    fn add_transaction_checks_wallets() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let mut session = open(today);
        let err = session
            .add_transaction(today, TransactionBody::expense("bank", 5.0, "Food", ""), None)
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));

        let id = session
            .add_transaction(today, TransactionBody::expense("cash", 5.0, "Food", ""), None)
            .unwrap();
        assert_eq!(session.transactions()[0].id, id);
        assert!(!session.has_unsaved_changes());
    }

    #[test]
    fn new_template_generates_on_next_processing_day() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let mut session = open(today);
        session
            .add_transaction(
                NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
                TransactionBody::income("cash", 10.0, "Allowance", ""),
                Some(Recurrence::Daily),
            )
            .unwrap();
        let report = session.process_recurring();
        assert_eq!(report.generated, 2);
        assert!(report.persisted);
        assert_eq!(session.stats().total_income, 30.0);
        assert_eq!(session.process_recurring().generated, 0);
    }

    #[test]
    fn remove_unknown_transaction_is_not_found() {
        let mut session = open(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        assert!(matches!(
            session.remove_transaction("missing"),
            Err(LedgerError::NotFound(_))
        ));
    }

    #[test]
    fn zero_budget_removes_category() {
        let mut session = open(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        session.set_budget("Food", 200.0).unwrap();
        assert_eq!(session.budgets().get("Food"), Some(&200.0));
        session.set_budget("Food", 0.0).unwrap();
        assert!(session.budgets().is_empty());
        assert!(session.set_budget("Food", -1.0).is_err());
    }

    #[test]
    fn empty_account_gets_a_default_cash_wallet() {
        let temp = TempDir::new().unwrap();
        let backend = JsonStorage::new(temp.path().to_path_buf()).unwrap();
        let store = AccountStore::new(Box::new(backend.clone()));
        let orphan = TransactionRecord::from(Occurrence {
            id: "old".into(),
            date: day(2),
            body: TransactionBody::expense("", 7.5, "Food", "lunch"),
        });
        let mut owned = orphan.clone();
        owned.id = "kept".into();
        owned.wallet_id = "elsewhere".into();
        store
            .save_transactions("jane", &[orphan, owned])
            .unwrap();

        let (session, report) = AccountSession::open(
            store,
            "jane",
            Box::new(FixedClock::new(day(10))),
            Box::new(SequentialIds::new("w")),
        )
        .unwrap();
        assert!(report.persisted);
        assert_eq!(session.wallets().len(), 1);
        let wallet = &session.wallets()[0];
        assert_eq!((wallet.id.as_str(), wallet.name.as_str()), ("w-1", "Cash"));
        assert_eq!(wallet.kind, WalletKind::Cash);
        assert_eq!(session.transactions()[0].wallet_id, "w-1");
        assert_eq!(session.transactions()[1].wallet_id, "elsewhere");

        let reread = AccountStore::new(Box::new(backend));
        assert_eq!(reread.load_wallets("jane").unwrap(), session.wallets());
        assert_eq!(reread.load_transactions("jane").unwrap()[0].wallet_id, "w-1");
    }

    #[test]
    fn existing_wallets_are_left_alone() {
        let store = AccountStore::new(Box::new(MemoryStorage::new()));
        store
            .save_wallets("jane", &[Wallet::new("bank", "Bank", WalletKind::Bank)])
            .unwrap();
        let (session, report) = AccountSession::open(
            store,
            "jane",
            Box::new(FixedClock::new(day(10))),
            Box::new(SequentialIds::new("w")),
        )
        .unwrap();
        assert!(!report.persisted);
        assert_eq!(session.wallets().len(), 1);
        assert_eq!(session.wallets()[0].id, "bank");
    }

    #[test]
    fn wallet_removal_is_guarded() {
        let mut session = open(day(10));
        // The default wallet plus "cash".
        assert_eq!(session.wallets().len(), 2);
        session
            .add_transaction(day(9), TransactionBody::expense("cash", 5.0, "Food", ""), None)
            .unwrap();

        assert!(matches!(
            session.remove_wallet("cash"),
            Err(LedgerError::InvalidInput(_))
        ));
        assert!(matches!(
            session.remove_wallet("nope"),
            Err(LedgerError::NotFound(_))
        ));
        session.remove_wallet("id-1").unwrap();
        assert!(matches!(
            session.remove_wallet("cash"),
            Err(LedgerError::InvalidInput(_))
        ));
        assert_eq!(session.wallets().len(), 1);
    }

    #[test]
    fn update_wallet_replaces_by_id() {
        let mut session = open(day(10));
        let renamed = Wallet::new("cash", "Purse", WalletKind::Cash).with_initial_balance(40.0);
        session.update_wallet(renamed.clone()).unwrap();
        assert_eq!(session.wallets()[1], renamed);
        assert!(matches!(
            session.update_wallet(Wallet::new("nope", "X", WalletKind::Other)),
            Err(LedgerError::NotFound(_))
        ));
    }

    #[test]
    fn transfer_target_keeps_wallet_in_use() {
        let mut session = open(day(10));
        session
            .add_wallet(Wallet::new("bank", "Bank", WalletKind::Bank))
            .unwrap();
        session
            .add_transaction(day(9), TransactionBody::transfer("cash", "bank", 20.0, ""), None)
            .unwrap();
        assert!(session.remove_wallet("bank").is_err());
    }

    #[test]
    fn deposit_records_savings_expense_and_raises_goal() {
        let mut session = open(day(10));
        session
            .save_goal(SavingsGoal {
                id: "trip".into(),
                name: "Trip".into(),
                target_amount: 1000.0,
                current_amount: 100.0,
                color: String::new(),
                deadline: None,
            })
            .unwrap();

        let id = session.deposit_to_goal("trip", "cash", 250.0).unwrap();
        let txn = session.transactions().iter().find(|t| t.id == id).unwrap();
        assert_eq!(txn.kind, TransactionKind::Expense);
        assert_eq!(txn.category, "Savings");
        assert_eq!(txn.description, "Deposit to Goal: Trip");
        assert_eq!(txn.date, "2024-01-10");
        assert_eq!(txn.recurrence.as_deref(), Some("none"));
        assert_eq!(session.goals()[0].current_amount, 350.0);
        assert!(!session.has_unsaved_changes());

        assert!(matches!(
            session.deposit_to_goal("missing", "cash", 1.0),
            Err(LedgerError::NotFound(_))
        ));
        assert!(session.deposit_to_goal("trip", "cash", 0.0).is_err());
        assert_eq!(session.goals()[0].current_amount, 350.0);
    }

    #[test]
    fn update_replaces_in_place_and_keeps_the_watermark() {
        let mut session = open(day(10));
        let id = session
            .add_transaction(
                day(1),
                TransactionBody::expense("cash", 3.0, "Coffee", ""),
                Some(Recurrence::Daily),
            )
            .unwrap();
        assert_eq!(session.process_recurring().generated, 9);
        let count = session.transactions().len();

        session
            .update_transaction(
                &id,
                day(1),
                TransactionBody::expense("cash", 3.5, "Coffee", "oat milk"),
                Some(Recurrence::Daily),
            )
            .unwrap();
        let updated = &session.transactions()[0];
        assert_eq!(updated.id, id);
        assert_eq!(updated.amount, 3.5);
        assert_eq!(updated.last_processed_date.as_deref(), Some("2024-01-10"));
        assert_eq!(session.process_recurring().generated, 0);
        assert_eq!(session.transactions().len(), count);

        session
            .update_transaction(&id, day(1), TransactionBody::expense("cash", 3.5, "Coffee", ""), None)
            .unwrap();
        assert_eq!(session.transactions()[0].recurrence.as_deref(), Some("none"));
        assert_eq!(session.transactions()[0].last_processed_date, None);
        assert!(matches!(
            session.update_transaction(
                "missing",
                day(1),
                TransactionBody::expense("cash", 1.0, "Food", ""),
                None
            ),
            Err(LedgerError::NotFound(_))
        ));
    }
}
