use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WalletKind {
    #[default]
    Cash,
    Bank,
    Credit,
    Other,
}

/// A place money is held, e.g. a purse or a bank account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: WalletKind,
    #[serde(default)]
    pub initial_balance: f64,
    #[serde(default)]
    pub color: String,
}

impl Wallet {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: WalletKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            initial_balance: 0.0,
            color: String::new(),
        }
    }

    pub fn with_initial_balance(mut self, amount: f64) -> Self {
        self.initial_balance = amount;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SavingsGoal {
    pub id: String,
    pub name: String,
    pub target_amount: f64,
    #[serde(default)]
    pub current_amount: f64,
    #[serde(default)]
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
}

impl SavingsGoal {
    /// Fraction of the target already saved, clamped to `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        if self.target_amount <= 0.0 {
            return 1.0;
        }
        (self.current_amount / self.target_amount).clamp(0.0, 1.0)
    }
}

/// Monthly spending limit per expense category.
pub type BudgetMap = BTreeMap<String, f64>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wallet_reads_stored_shape() {
        let wallet: Wallet = serde_json::from_str(
            r##"{"id":"w1","name":"Main","type":"bank","initialBalance":150.5,"color":"#fff"}"##,
        )
        .unwrap();
        assert_eq!(wallet.kind, WalletKind::Bank);
        assert_eq!(wallet.initial_balance, 150.5);
    }

    #[test]
    fn goal_progress_is_clamped() {
        let mut goal = SavingsGoal {
            id: "g".into(),
            name: "Bike".into(),
            target_amount: 200.0,
            current_amount: 50.0,
            color: String::new(),
            deadline: None,
        };
        assert_eq!(goal.progress(), 0.25);
        goal.current_amount = 500.0;
        assert_eq!(goal.progress(), 1.0);
    }
}
