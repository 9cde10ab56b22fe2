//! Aggregations over an account's transactions: wallet balances, totals and
//! monthly budget usage.

use std::collections::BTreeMap;

use chrono::Datelike;

use super::{
    transaction::{parse_date, TransactionKind, TransactionRecord},
    wallet::{BudgetMap, Wallet},
};

const BUDGET_WARNING_RATIO: f64 = 0.8;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Stats {
    pub total_income: f64,
    pub total_expense: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetStatus {
    UnderBudget,
    NearLimit,
    OverBudget,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BudgetUsage {
    pub category: String,
    pub limit: f64,
    pub spent: f64,
    pub status: BudgetStatus,
}

impl BudgetUsage {
    pub fn remaining(&self) -> f64 {
        self.limit - self.spent
    }
}

/// Current balance of every wallet, keyed by wallet id.
///
/// Transactions booked against unknown wallets are ignored; a transfer into
/// an unknown wallet still debits its source.
pub fn wallet_balances(
    wallets: &[Wallet],
    transactions: &[TransactionRecord],
) -> BTreeMap<String, f64> {
    let mut balances: BTreeMap<String, f64> = wallets
        .iter()
        .map(|wallet| (wallet.id.clone(), wallet.initial_balance))
        .collect();

    for txn in transactions {
        if !balances.contains_key(&txn.wallet_id) {
            continue;
        }
        match txn.kind {
            TransactionKind::Income => credit(&mut balances, &txn.wallet_id, txn.amount),
            TransactionKind::Expense => credit(&mut balances, &txn.wallet_id, -txn.amount),
            TransactionKind::Transfer => {
                let Some(target) = txn.transfer_to_wallet_id.as_deref() else {
                    continue;
                };
                credit(&mut balances, &txn.wallet_id, -txn.amount);
                credit(&mut balances, target, txn.amount);
            }
        }
    }
    balances
}

pub fn stats(wallets: &[Wallet], transactions: &[TransactionRecord]) -> Stats {
    let balance = wallet_balances(wallets, transactions).values().sum();
    let mut totals = Stats {
        balance,
        ..Stats::default()
    };
    for txn in transactions {
        match txn.kind {
            TransactionKind::Income => totals.total_income += txn.amount,
            TransactionKind::Expense => totals.total_expense += txn.amount,
            TransactionKind::Transfer => {}
        }
    }
    totals
}

/// Expense totals per category for one calendar month. Transactions whose
/// date cannot be read are left out.
pub fn category_spending(
    transactions: &[TransactionRecord],
    year: i32,
    month: u32,
) -> BTreeMap<String, f64> {
    let mut spending = BTreeMap::new();
    for txn in transactions
        .iter()
        .filter(|txn| txn.kind == TransactionKind::Expense)
    {
        let Ok(date) = parse_date(&txn.date) else {
            continue;
        };
        if date.year() == year && date.month() == month {
            *spending.entry(txn.category.clone()).or_insert(0.0) += txn.amount;
        }
    }
    spending
}

/// Compares each positive budget limit with the month's spending.
pub fn budget_usage(
    budgets: &BudgetMap,
    transactions: &[TransactionRecord],
    year: i32,
    month: u32,
) -> Vec<BudgetUsage> {
    let spending = category_spending(transactions, year, month);
    budgets
        .iter()
        .filter(|(_, limit)| **limit > 0.0)
        .map(|(category, limit)| {
            let spent = spending.get(category).copied().unwrap_or(0.0);
            BudgetUsage {
                category: category.clone(),
                limit: *limit,
                spent,
                status: classify(spent, *limit),
            }
        })
        .collect()
}

fn classify(spent: f64, limit: f64) -> BudgetStatus {
    if spent > limit {
        BudgetStatus::OverBudget
    } else if spent >= limit * BUDGET_WARNING_RATIO {
        BudgetStatus::NearLimit
    } else {
        BudgetStatus::UnderBudget
    }
}

fn credit(balances: &mut BTreeMap<String, f64>, wallet_id: &str, amount: f64) {
    if let Some(balance) = balances.get_mut(wallet_id) {
        *balance += amount;
    }
}
