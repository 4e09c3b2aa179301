use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const MARCH: &str = "Date,Description,Amount,Balance
2017-03-01,Transaction 170301 Rent,-100.00,
2017-03-02,Transaction 170302 Cafe Central,-50.00,
2017-03-03,Salary,200.00,1000.00
";

struct Fixture {
    config: TempDir,
    exports: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let fixture = Self {
            config: tempfile::tempdir().unwrap(),
            exports: tempfile::tempdir().unwrap(),
        };
        std::fs::write(fixture.exports.path().join("2017_March.csv"), MARCH).unwrap();
        std::fs::write(
            fixture.exports.path().join("category_definitions.json"),
            r#"{"settings": {}, "categories": {"Housing": ["rent"], "Unknown": []}}"#,
        )
        .unwrap();
        fixture
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("spendlens").unwrap();
        cmd.env("SPENDLENS_CONFIG_DIR", self.config.path())
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG");
        cmd
    }

    fn dir(&self) -> &Path {
        self.exports.path()
    }

    fn import(&self) {
        self.cmd()
            .arg("import")
            .arg(self.dir())
            .assert()
            .success()
            .stdout(predicate::str::contains("3 rows imported from 1 file(s)"));
    }
}

#[test]
fn import_remembers_directory_for_reports() {
    let fx = Fixture::new();
    fx.import();

    fx.cmd()
        .args(["report", "categories"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Housing"))
        .stdout(predicate::str::contains("2017:March"))
        .stdout(predicate::str::contains("100.00"))
        .stdout(predicate::str::contains("50.00"));

    fx.cmd()
        .args(["report", "overview"])
        .assert()
        .success()
        .stdout(predicate::str::contains("200.00"))
        .stdout(predicate::str::contains("150.00"));
}

#[test]
fn balance_report_reconstructs_from_last_balance() {
    let fx = Fixture::new();
    fx.import();

    fx.cmd()
        .args(["report", "balance"])
        .assert()
        .success()
        .stdout(predicate::str::contains("850.00"))
        .stdout(predicate::str::contains("800.00"))
        .stdout(predicate::str::contains("1,000.00"));
}

#[test]
fn category_edits_reclassify_unknown_rows() {
    let fx = Fixture::new();
    fx.import();

    fx.cmd()
        .args(["categories", "unknown"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Transaction 170302 Cafe Central"));

    fx.cmd()
        .args(["categories", "add", "Coffee"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added category: Coffee"));
    fx.cmd()
        .args(["categories", "add-keyword", "Coffee", "cafe"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 description(s) still unmatched"));

    let saved = std::fs::read_to_string(fx.dir().join("category_definitions.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&saved).unwrap();
    assert_eq!(json["categories"]["Coffee"], serde_json::json!(["cafe"]));
    assert_eq!(json["categories"]["Unknown"], serde_json::json!([]));
    assert_eq!(json["settings"]["date_format"], "%Y-%m-%d");
}

#[test]
fn detail_lists_rows_of_one_category() {
    let fx = Fixture::new();
    fx.import();

    fx.cmd()
        .args(["report", "detail", "2017-03", "Housing"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Transaction 170301 Rent"))
        .stdout(predicate::str::contains("100.00"))
        .stdout(predicate::str::contains("Cafe").not());

    fx.cmd()
        .args(["report", "detail", "2017:Smarch", "Housing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown month"));
}

#[test]
fn search_matches_description_ignoring_case() {
    let fx = Fixture::new();
    fx.import();

    fx.cmd()
        .args(["search", "SALARY"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 transaction(s)"));
}

#[test]
fn layout_options_stay_with_their_directory() {
    let fx = Fixture::new();
    let other = tempfile::tempdir().unwrap();
    std::fs::write(
        other.path().join("2017_April.csv"),
        "2017-04-01;Transaction 170401 Rent;-100,00;900,00\n2017-04-02;Bakery;-5,50;894,50\n",
    )
    .unwrap();

    fx.cmd()
        .arg("import")
        .arg(other.path())
        .args(["--delimiter", ";", "--no-header"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 rows imported from 1 file(s)"));

    let saved = std::fs::read_to_string(other.path().join("category_definitions.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&saved).unwrap();
    assert_eq!(json["settings"]["delimiter"], ";");
    assert_eq!(json["settings"]["has_header"], false);

    fx.cmd()
        .args(["report", "monthly"])
        .assert()
        .success()
        .stdout(predicate::str::contains("105.50"));

    fx.cmd()
        .args(["report", "monthly", "--dir"])
        .arg(fx.dir())
        .assert()
        .success()
        .stdout(predicate::str::contains("150.00"));
}

#[test]
fn unknown_alias_takes_no_keywords() {
    let fx = Fixture::new();
    fx.import();

    fx.cmd()
        .args(["categories", "add-keyword", "Unknown", "cafe"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("reserved"));

    fx.cmd()
        .args(["categories", "unknown"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Transaction 170302 Cafe Central"));
}

#[test]
fn reports_need_an_import_directory() {
    let fx = Fixture::new();
    fx.cmd()
        .args(["report", "monthly"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No import directory"));
}

#[test]
fn bad_amount_names_the_file() {
    let fx = Fixture::new();
    std::fs::write(
        fx.dir().join("2017_April.csv"),
        "Date,Description,Amount,Balance\n2017-04-01,Broken,twelve,\n",
    )
    .unwrap();
    fx.cmd()
        .arg("import")
        .arg(fx.dir())
        .assert()
        .failure()
        .stderr(predicate::str::contains("2017_April.csv"));
}

#[test]
fn sniff_reports_layout() {
    let fx = Fixture::new();
    fx.cmd()
        .arg("sniff")
        .arg(fx.dir())
        .assert()
        .success()
        .stdout(predicate::str::contains("Delimiter: ','"))
        .stdout(predicate::str::contains("Header row: yes"));
}
