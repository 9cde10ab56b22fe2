#![doc(test(attr(deny(warnings))))]

//! Core of a personal-finance ledger: wallets, transactions, budgets and the
//! materializer that turns recurring templates into concrete transactions.

pub mod cli;
pub mod config;
pub mod core;
pub mod errors;
pub mod ledger;
pub mod storage;
pub mod utils;

use std::sync::Once;

pub use errors::{LedgerError, Result};

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("mda_core tracing initialized.");
    });
}
