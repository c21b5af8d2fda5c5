use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

const Y2008: &str = "\"txNomeParlamentar\";\"cpf\";\"vlrDocumento\";\"urlDocumento\"
\"Ana\";\"12345\";\"100,00\";\"http://doc/1\"
\"Ana\";\"12345\";\"abc\";\"\"
\"Bia\";\"777\";\"5,00\";\"http://doc/2\"
";

const Y2009: &str = "\"txNomeParlamentar\";\"cpf\";\"vlrDocumento\";\"urlDocumento\";\"novo\"
\"Ana\";\"12345\";\"-3,50\";\"http://doc/3\";\"x\"
";

fn gastos(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("gastos").unwrap();
    cmd.env("HOME", home).env("NO_COLOR", "1").env("RUST_LOG", "warn");
    cmd
}

fn setup() -> tempfile::TempDir {
    let home = tempfile::tempdir().unwrap();
    let csv_dir = home.path().join("csv");
    std::fs::create_dir_all(&csv_dir).unwrap();
    std::fs::write(csv_dir.join("Year-2008.csv"), Y2008).unwrap();
    std::fs::write(csv_dir.join("Year-2009.csv"), Y2009).unwrap();

    gastos(home.path())
        .args(["init", "--source-dir"])
        .arg(&csv_dir)
        .arg("--db")
        .arg(home.path().join("gastos.db"))
        .args(["--from", "2007", "--to", "2009"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created settings"));
    home
}

#[test]
fn ingest_loads_all_years_and_reports_drift() {
    let home = setup();
    gastos(home.path())
        .arg("ingest")
        .assert()
        .success()
        .stdout(predicate::str::contains("missing"))
        .stdout(predicate::str::contains("novo"))
        .stdout(predicate::str::contains("4 rows inserted"));

    gastos(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Rows:       4"))
        .stdout(predicate::str::contains("Year-2009.csv"));
}

#[test]
fn lookup_shows_only_documents_with_urls() {
    let home = setup();
    gastos(home.path())
        .args(["lookup", "12345"])
        .assert()
        .success()
        .stdout(predicate::str::contains("http://doc/1"))
        .stdout(predicate::str::contains("http://doc/3"))
        .stdout(predicate::str::contains("R$ 100,00"))
        .stdout(predicate::str::contains("R$ 3,50"))
        .stdout(predicate::str::contains("2 documents"));
}

#[test]
fn lookup_unknown_person_fails() {
    let home = setup();
    gastos(home.path())
        .args(["lookup", "000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No data found for 000"));
}

#[test]
fn ingest_without_sources_is_fatal() {
    let home = tempfile::tempdir().unwrap();
    gastos(home.path())
        .args(["init", "--source-dir"])
        .arg(home.path().join("empty"))
        .arg("--db")
        .arg(home.path().join("gastos.db"))
        .assert()
        .success();
    gastos(home.path())
        .arg("ingest")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No source data available"));
}

#[test]
fn status_on_fresh_database_shows_no_ingestions() {
    let home = setup();
    std::fs::write(home.path().join("gastos.db"), b"").unwrap();
    gastos(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Rows:       0"))
        .stdout(predicate::str::contains("Recent ingestions").not());
}

#[test]
fn status_reports_unreadable_database() {
    let home = setup();
    std::fs::write(home.path().join("gastos.db"), vec![b'x'; 4096]).unwrap();
    gastos(home.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}
