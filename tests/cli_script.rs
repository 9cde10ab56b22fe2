use assert_cmd::Command;
use predicates::str::contains;
use tempfile::{NamedTempFile, TempDir};

const TEMPLATE: &str = r#"[
  {
    "id": "rent",
    "date": "2024-01-01",
    "type": "expense",
    "amount": 850,
    "category": "Housing",
    "description": "rent",
    "walletId": "bank",
    "recurrence": "daily"
  }
]"#;

fn cli(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("mda_core_cli").unwrap();
    cmd.env("RUST_LOG", "off").arg("--home").arg(home.path());
    cmd
}

#[test]
fn import_materializes_and_persists() {
    let home = TempDir::new().unwrap();
    let file = NamedTempFile::new().unwrap();
    std::fs::write(file.path(), TEMPLATE).unwrap();

    cli(&home)
        .args(["--date", "2024-01-03", "import", "jane@example.com"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(contains("imported 1 transactions"))
        .stdout(contains("generated 2 occurrence(s)"));

    let stored = home
        .path()
        .join("data")
        .join("MDA_APP_jane@example.com_transactions.json");
    let json = std::fs::read_to_string(stored).unwrap();
    assert!(json.contains("\"lastProcessedDate\": \"2024-01-03\""));

    // Same day again: nothing left to generate.
    cli(&home)
        .args(["--date", "2024-01-03", "process", "jane@example.com"])
        .assert()
        .success()
        .stdout(contains("generated 0 occurrence(s)"));

    cli(&home)
        .args(["--date", "2024-01-03", "recurring", "jane@example.com"])
        .assert()
        .success()
        .stdout(contains("next 2024-01-04 behind 0"));
}

#[test]
fn export_prints_stored_transactions() {
    let home = TempDir::new().unwrap();
    let file = NamedTempFile::new().unwrap();
    std::fs::write(file.path(), TEMPLATE).unwrap();
    cli(&home)
        .args(["--date", "2024-01-02", "import", "sam"])
        .arg(file.path())
        .assert()
        .success();

    cli(&home)
        .args(["--date", "2024-01-02", "export", "sam"])
        .assert()
        .success()
        .stdout(contains("\"walletId\": \"bank\""))
        .stdout(contains("\"date\": \"2024-01-02\""));
}

#[test]
fn rejects_non_array_import() {
    let home = TempDir::new().unwrap();
    let file = NamedTempFile::new().unwrap();
    std::fs::write(file.path(), r#"{"id":"x"}"#).unwrap();

    cli(&home)
        .args(["import", "sam"])
        .arg(file.path())
        .assert()
        .failure()
        .stderr(contains("JSON array"));
}

#[test]
fn unknown_command_prints_usage() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .args(["launch", "sam"])
        .assert()
        .failure()
        .stderr(contains("unknown command"))
        .stderr(contains("usage: mda_core_cli"));
}

#[test]
fn summary_lists_totals_and_wallets() {
    let home = TempDir::new().unwrap();
    let file = NamedTempFile::new().unwrap();
    std::fs::write(file.path(), TEMPLATE).unwrap();
    cli(&home)
        .args(["--date", "2024-01-03", "import", "kim"])
        .arg(file.path())
        .assert()
        .success();

    cli(&home)
        .args(["--date", "2024-01-03", "summary", "kim"])
        .assert()
        .success()
        .stdout(contains("expense: 2550.00 USD"))
        .stdout(contains("Cash"))
        .stdout(contains("0.00"));
}
