#![allow(dead_code)]

use std::{path::PathBuf, sync::Mutex};

use chrono::NaiveDate;
use mda_core::ledger::{TransactionKind, TransactionRecord};
use once_cell::sync::Lazy;
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Creates an isolated directory that outlives the calling test.
pub fn temp_dir() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let path = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    path
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn concrete(id: &str, day: &str, kind: TransactionKind, amount: f64) -> TransactionRecord {
    TransactionRecord {
        id: id.into(),
        date: day.into(),
        kind,
        amount,
        category: "Groceries".into(),
        description: "weekly shop".into(),
        wallet_id: "cash".into(),
        transfer_to_wallet_id: None,
        recurrence: Some("none".into()),
        last_processed_date: None,
    }
}

pub fn template(id: &str, day: &str, recurrence: &str) -> TransactionRecord {
    TransactionRecord {
        id: id.into(),
        date: day.into(),
        kind: TransactionKind::Expense,
        amount: 49.99,
        category: "Subscriptions".into(),
        description: "streaming".into(),
        wallet_id: "cash".into(),
        transfer_to_wallet_id: None,
        recurrence: Some(recurrence.into()),
        last_processed_date: None,
    }
}

pub fn generated(records: &[TransactionRecord], template_len: usize) -> &[TransactionRecord] {
    &records[template_len..]
}

pub fn dates(records: &[TransactionRecord]) -> Vec<String> {
    records.iter().map(|r| r.date.clone()).collect()
}
