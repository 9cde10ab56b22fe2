use std::{fs, path::PathBuf};

use chrono::{Datelike, NaiveDate};
use thiserror::Error;

use crate::{
    config::ConfigManager,
    core::{
        clock::{Clock, FixedClock, SystemClock},
        ids::UuidGenerator,
        session::{AccountSession, SessionLoad},
        utils::PathResolver,
    },
    errors::LedgerError,
    ledger::{format_date, parse_date},
    storage::AccountStore,
};

/// User-facing CLI error wrapper.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] LedgerError),
    #[error("Invalid input: {0}")]
    Input(String),
}

const USAGE: &str = "\
usage: mda_core_cli [--home DIR] [--date YYYY-MM-DD] <command> <account> [args]

commands:
  process <account>          generate due recurring transactions
  summary <account>          balances, totals and this month's budgets
  recurring <account>        list recurring templates
  import <account> <file>    replace transactions with a JSON array
  export <account>           print transactions as JSON";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Process,
    Summary,
    Recurring,
    Import(PathBuf),
    Export,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub home: Option<PathBuf>,
    pub date: Option<NaiveDate>,
    pub account: String,
    pub command: Command,
}

pub fn usage() -> &'static str {
    USAGE
}

/// Parses arguments, excluding the program name.
pub fn parse_args<I>(args: I) -> Result<Invocation, CliError>
where
    I: IntoIterator<Item = String>,
{
    let mut home = None;
    let mut date = None;
    let mut positional = Vec::new();
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--home" => {
                let value = iter
                    .next()
                    .ok_or_else(|| CliError::Input("--home needs a directory".into()))?;
                home = Some(PathBuf::from(value));
            }
            "--date" => {
                let value = iter
                    .next()
                    .ok_or_else(|| CliError::Input("--date needs a value".into()))?;
                date = Some(parse_date(&value)?);
            }
            flag if flag.starts_with("--") => {
                return Err(CliError::Input(format!("unknown option `{flag}`")));
            }
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let name = positional
        .next()
        .ok_or_else(|| CliError::Input("missing command".into()))?;
    let account = positional
        .next()
        .ok_or_else(|| CliError::Input("missing account".into()))?;
    let command = match name.as_str() {
        "process" => Command::Process,
        "summary" => Command::Summary,
        "recurring" => Command::Recurring,
        "export" => Command::Export,
        "import" => {
            let file = positional
                .next()
                .ok_or_else(|| CliError::Input("import needs a file".into()))?;
            Command::Import(PathBuf::from(file))
        }
        other => return Err(CliError::Input(format!("unknown command `{other}`"))),
    };
    if let Some(extra) = positional.next() {
        return Err(CliError::Input(format!("unexpected argument `{extra}`")));
    }
    Ok(Invocation {
        home,
        date,
        account,
        command,
    })
}

pub fn run_cli() -> Result<(), CliError> {
    let invocation = parse_args(std::env::args().skip(1))?;
    run(invocation)
}

pub fn run(invocation: Invocation) -> Result<(), CliError> {
    let base = PathResolver::resolve_base(invocation.home.clone());
    let manager = ConfigManager::with_base_dir(base)?;
    let config = manager.load()?;
    let store = config.account_store(manager.base_dir())?;
    let clock: Box<dyn Clock> = match invocation.date {
        Some(date) => Box::new(FixedClock::new(date)),
        None => Box::new(SystemClock),
    };
    run_with_store(invocation, store, clock, &config.currency)
}

/// Runs one command against an already opened store. Any failure to save,
/// whether on open or after an import, makes the command fail.
pub fn run_with_store(
    invocation: Invocation,
    store: AccountStore,
    clock: Box<dyn Clock>,
    currency: &str,
) -> Result<(), CliError> {
    let today = clock.today();
    let (mut session, report) =
        AccountSession::open(store, &invocation.account, clock, Box::new(UuidGenerator))?;

    match invocation.command {
        Command::Process => print_report(&report),
        Command::Summary => {
            print_report(&report);
            let stats = session.stats();
            println!("income:  {:.2} {}", stats.total_income, currency);
            println!("expense: {:.2} {}", stats.total_expense, currency);
            println!("balance: {:.2} {}", stats.balance, currency);
            let balances = session.wallet_balances();
            for wallet in session.wallets() {
                let balance = balances
                    .get(&wallet.id)
                    .copied()
                    .unwrap_or(wallet.initial_balance);
                println!("  {:<20} {:>12.2}", wallet.name, balance);
            }
            for usage in session.budget_usage(today.year(), today.month()) {
                println!(
                    "  budget {:<13} {:>10.2} / {:<10.2} {:?}",
                    usage.category, usage.spent, usage.limit, usage.status
                );
            }
        }
        Command::Recurring => {
            for snapshot in session.recurrence_snapshots() {
                let next = snapshot
                    .next_due
                    .map(format_date)
                    .unwrap_or_else(|| "-".into());
                println!(
                    "{:<38} {:<8} next {} behind {}",
                    snapshot.template_id,
                    snapshot.recurrence.label(),
                    next,
                    snapshot.behind
                );
            }
        }
        Command::Import(path) => {
            let json = fs::read_to_string(&path).map_err(LedgerError::from)?;
            let imported = session.import_json(&json)?;
            println!(
                "imported {} transactions",
                session.transactions().len() - imported.generated
            );
            print_report(&imported);
            if let Some(err) = imported.persist_error {
                return Err(CliError::Core(err));
            }
        }
        Command::Export => println!("{}", session.export_json()?),
    }

    if let Some(err) = report.persist_error {
        return Err(CliError::Core(err));
    }
    Ok(())
}

fn print_report(report: &SessionLoad) {
    println!(
        "{}: generated {} occurrence(s), skipped {} template(s)",
        format_date(report.reference_date),
        report.generated,
        report.skipped.len()
    );
    for skipped in &report.skipped {
        println!("  skipped {}: {}", skipped.id, skipped.reason);
    }
    if let Some(err) = &report.persist_error {
        println!("  not saved: {err}");
    }
}
