use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn cli(data_dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("minidesk").unwrap();
    cmd.env_remove("MINIDESK_DATA_DIR")
        .env_remove("RUST_LOG")
        .arg("--data-dir")
        .arg(data_dir);
    cmd
}

#[test]
fn summary_covers_the_selected_window() {
    let dir = tempdir().unwrap();
    cli(dir.path())
        .args(["finance", "add", "3000", "Pay", "--kind", "income", "--category", "Salary"])
        .args(["--date", "2024-03-01"])
        .assert()
        .success();
    cli(dir.path())
        .args(["finance", "add", "1200", "Rent", "--category", "Housing", "--date", "2024-03-02"])
        .assert()
        .success();
    cli(dir.path())
        .args(["finance", "add", "80", "Groceries", "--category", "Food", "--date", "2024-02-20"])
        .assert()
        .success();

    cli(dir.path())
        .args(["finance", "summary", "--view", "month", "--anchor", "2024-03-15"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Income:  3000.00"))
        .stdout(predicate::str::contains("Expense: 1200.00"))
        .stdout(predicate::str::contains("Balance: 1800.00"));

    cli(dir.path())
        .args(["finance", "summary", "--view", "year", "--anchor", "2024-03-15"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Expense: 1280.00"))
        .stdout(predicate::str::contains("Balance: 1720.00"));

    let output = cli(dir.path())
        .args(["finance", "list", "--view", "all"])
        .output()
        .unwrap();
    let text = String::from_utf8_lossy(&output.stdout);
    let dates: Vec<_> = text
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .collect();
    assert_eq!(dates, vec!["2024-03-02", "2024-03-01", "2024-02-20"]);
}

#[test]
fn negative_amount_is_refused() {
    let dir = tempdir().unwrap();
    cli(dir.path())
        .args(["finance", "add", "--", "-5", "Refund"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be at least 0"));
}

#[test]
fn recurring_expenses_total() {
    let dir = tempdir().unwrap();
    cli(dir.path())
        .args(["expenses", "add", "Rent", "1200", "--due-day", "1"])
        .assert()
        .success();
    cli(dir.path())
        .args(["expenses", "add", "Phone", "35.5", "--due-day", "31"])
        .assert()
        .success();
    cli(dir.path())
        .args(["expenses", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Monthly total: 1235.50 USD"));
}

#[test]
fn currency_preference_is_validated_and_used() {
    let dir = tempdir().unwrap();
    cli(dir.path())
        .args(["prefs", "set-currency", "euro"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a three-letter currency code"));

    cli(dir.path())
        .args(["prefs", "set-currency", "eur"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Currency set to EUR"));

    cli(dir.path())
        .args(["prefs", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"currency\": \"EUR\""));

    let export = dir.path().join("exported.json");
    cli(dir.path())
        .args(["prefs", "export"])
        .arg(&export)
        .assert()
        .success();
    let exported: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&export).unwrap()).unwrap();
    assert_eq!(exported["finance"]["currency"], "EUR");
}
