//! Ledger domain models, recurrence arithmetic, and the recurring-transaction
//! materializer.

pub mod recurrence;
pub mod recurring;
pub mod summary;
pub mod transaction;
pub mod wallet;

pub use recurrence::Recurrence;
pub use recurring::{
    due_occurrences, materialize, next_due_date, pending_occurrences, snapshot_templates,
    MaterializeOutcome, RecurrenceSnapshot, SkippedTemplate, MAX_CATCH_UP_ITERATIONS,
};
pub use summary::{BudgetStatus, BudgetUsage, Stats};
pub use transaction::{
    format_date, parse_date, Occurrence, RecurringTemplate, Transaction, TransactionBody,
    TransactionKind, TransactionRecord,
};
pub use wallet::{BudgetMap, SavingsGoal, Wallet, WalletKind};
