mod common;

use std::fs;

use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;

use common::{PEOPLE_CSV, TestWorkspace, serve_once, weaver};

#[test]
fn process_dry_run_writes_json_and_sql() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("people.csv", PEOPLE_CSV);
    let json_out = workspace.path().join("records.json");
    let sql_out = workspace.path().join("records.sql");

    weaver()
        .args(["process", "--dry-run", "-i"])
        .arg(&input)
        .arg("--json-out")
        .arg(&json_out)
        .arg("--sql-out")
        .arg(&sql_out)
        .assert()
        .success()
        .stdout(contains("Distribution of 'age'"))
        .stdout(contains("54-61"))
        .stdout(contains("4 record(s) processed. Successfully inserted 4 records."));

    let records: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&json_out).expect("read json")).expect("json");
    let records = records.as_array().expect("array");
    assert_eq!(records.len(), 4);
    assert_eq!(records[0]["id"], 1);
    assert_eq!(records[0]["name"], "Alice Smith");
    assert_eq!(records[0]["score"], 88);
    assert_eq!(records[3]["address"]["city"], "Tromso");

    let sql = fs::read_to_string(&sql_out).expect("read sql");
    assert_eq!(sql.lines().count(), 4);
    assert!(sql.lines().all(|line| line.starts_with("INSERT INTO public.users")));
    assert!(sql.contains("St John''s"));
}

#[test]
fn process_posts_to_the_configured_endpoint() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("people.csv", PEOPLE_CSV);
    let (url, server) = serve_once("201 Created", r#"{"message":"Successfully inserted 4 records."}"#);

    weaver()
        .args(["process", "-i"])
        .arg(&input)
        .args(["--endpoint", url.as_str(), "--timeout-secs", "5"])
        .assert()
        .success()
        .stdout(contains("Successfully inserted 4 records."));

    let body: serde_json::Value =
        serde_json::from_str(&server.join().expect("server thread")).expect("json body");
    assert_eq!(body.as_array().map(Vec::len), Some(4));
}

#[test]
fn parse_prints_nested_records() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("people.csv", PEOPLE_CSV);

    let assert = weaver().args(["parse", "-i"]).arg(&input).assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf-8");
    let records: serde_json::Value = serde_json::from_str(&stdout).expect("json");
    assert_eq!(records[1]["name"]["full"], "Bob O'Neil");
    assert_eq!(records[1]["address"]["zip"], 5003);
    assert_eq!(records[1]["team"], "red");
}

#[test]
fn report_charts_a_selected_column() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("people.csv", PEOPLE_CSV);

    weaver()
        .args(["report", "--column", "score", "-i"])
        .arg(&input)
        .assert()
        .success()
        .stdout(contains("Distribution of 'score'"))
        .stdout(contains("65-71").and(contains("86-91")));
}

#[test]
fn report_rejects_text_column() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("people.csv", PEOPLE_CSV);

    weaver()
        .args(["report", "--column", "team", "-i"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(contains("column 'team' is not numeric"));
}

#[test]
fn sql_flexible_layout_keeps_age_out_of_the_json() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("people.csv", PEOPLE_CSV);

    weaver()
        .args(["sql", "--layout", "flexible", "-i"])
        .arg(&input)
        .assert()
        .success()
        .stdout(contains(
            "INSERT INTO public.flexible_data (record_age, data_json) VALUES (30, '{\"id\":1,\"name\":\"Alice Smith\"",
        ))
        .stdout(contains("\"age\"").not());
}

#[test]
fn non_csv_input_is_rejected() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("people.txt", PEOPLE_CSV);

    weaver()
        .args(["parse", "-i"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(contains("is not a .csv file"));
}

#[test]
fn ragged_row_reports_its_line() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("ragged.csv", "a,b\n1,2\na,b,c\n");

    weaver()
        .args(["process", "--dry-run", "-i"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(contains("Row 3 has 3 values, but header has 2 columns"));
}

#[test]
fn config_file_selects_strict_mode() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("people.csv", PEOPLE_CSV);
    let config = workspace.write("weaver.yaml", "mode: strict\n");

    weaver()
        .args(["report", "-c"])
        .arg(&config)
        .arg("-i")
        .arg(&input)
        .assert()
        .failure()
        .stderr(contains("validation error: record 1"));
}

#[test]
fn unknown_config_keys_are_rejected() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("people.csv", PEOPLE_CSV);
    let config = workspace.write("weaver.yaml", "modes: strict\n");

    weaver()
        .args(["sql", "-c"])
        .arg(&config)
        .arg("-i")
        .arg(&input)
        .assert()
        .failure()
        .stderr(contains("Parsing config YAML"));
}
