// crates/sangati-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for the run and validate commands.
// Purpose: Ensure report rendering and exit codes against SQLite fixtures.
// Dependencies: sangati-cli main helpers, rusqlite, tempfile
// ============================================================================

//! ## Overview
//! Drives `command_run` and `command_validate` against temporary `SQLite`
//! databases and config files, capturing output in memory.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use sangati_core::DataSourceResolver;
use sangati_core::ExecutionError;
use sangati_store_postgres::CredentialSource;
use tempfile::TempDir;

use super::EXIT_FAILED;
use super::EXIT_PASSED;
use super::RunCommand;
use super::SangatiConfig;
use super::SourceRegistry;
use super::ValidateCommand;
use super::apply_overrides;
use super::command_run;
use super::command_validate;
use crate::output::OutputFormat;

// ============================================================================
// SECTION: Helpers
// ============================================================================

const PASSING_TESTS: &str = r#"
[[tests]]
name = "user count"
types = ["int"]
queries = [{ db_index = 0, query = "SELECT count(*) FROM users" }]
operator = "eq"
values = ["2"]

[[tests]]
name = "replica matches"
types = ["int", "string"]
queries = [
  { db_index = 0, query = "SELECT id, name FROM users ORDER BY id" },
  { db_index = 1, query = "SELECT id, name FROM users ORDER BY id" },
]
"#;

const MIXED_TESTS: &str = r#"
[[tests]]
name = "user count"
types = ["int"]
queries = [{ db_index = 0, query = "SELECT count(*) FROM users" }]
operator = "eq"
values = ["2"]

[[tests]]
name = "too many users"
types = ["int"]
queries = [{ db_index = 0, query = "SELECT count(*) FROM users" }]
operator = "lt"
values = ["1"]

[[tests]]
name = "missing table"
types = ["int"]
queries = [{ db_index = 0, query = "SELECT count(*) FROM orders" }]
operator = "eq"
values = ["0"]
"#;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        seed(&dir.path().join("primary.db"));
        seed(&dir.path().join("replica.db"));
        Self {
            dir,
        }
    }

    fn databases(&self) -> String {
        let mut toml = String::new();
        for (index, file) in [(0, "primary.db"), (1, "replica.db")] {
            let path = self.dir.path().join(file);
            toml.push_str(&format!(
                "[[databases]]\nindex = {index}\ntype = \"sqlite\"\npath = {:?}\n\n",
                path.display().to_string()
            ));
        }
        toml
    }

    fn write_config(&self, tests: &str) -> PathBuf {
        let path = self.dir.path().join("sangati.toml");
        fs::write(&path, format!("{}{tests}", self.databases())).unwrap();
        path
    }
}

fn seed(path: &Path) {
    let connection = rusqlite::Connection::open(path).unwrap();
    connection
        .execute_batch(
            "CREATE TABLE users (id INTEGER, name TEXT);
             INSERT INTO users VALUES (1, 'ada');
             INSERT INTO users VALUES (2, 'grace');",
        )
        .unwrap();
}

fn run_command(config: PathBuf, format: OutputFormat) -> RunCommand {
    RunCommand {
        config: Some(config),
        jobs: None,
        timeout_ms: None,
        format,
    }
}

fn no_credentials() -> CredentialSource {
    CredentialSource::with_overrides(BTreeMap::new())
}

fn run_to_string(command: &RunCommand) -> (u8, String) {
    let mut out = Vec::new();
    let code = command_run(command, &no_credentials(), &mut out).unwrap();
    (code, String::from_utf8(out).unwrap())
}

// ============================================================================
// SECTION: Run Command
// ============================================================================

#[test]
fn passing_suite_exits_zero_with_text_report() {
    let fixture = Fixture::new();
    let config = fixture.write_config(PASSING_TESTS);
    let (code, output) = run_to_string(&run_command(config, OutputFormat::Text));
    assert_eq!(code, EXIT_PASSED);
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(
        lines,
        vec![
            "Test 'user count' PASSED",
            "Test 'replica matches' PASSED",
            "Total PASSED: 2, Total FAILED: 0",
        ]
    );
}

#[test]
fn failures_and_errors_exit_one_and_count_as_failed() {
    let fixture = Fixture::new();
    let config = fixture.write_config(MIXED_TESTS);
    let (code, output) = run_to_string(&run_command(config, OutputFormat::Text));
    assert_eq!(code, EXIT_FAILED);
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "Test 'user count' PASSED");
    assert!(lines[1].starts_with("Test 'too many users' FAILED: "), "{}", lines[1]);
    assert!(lines[2].starts_with("Test 'missing table' ERRORED: "), "{}", lines[2]);
    assert_eq!(lines[3], "Total PASSED: 1, Total FAILED: 2");
}

#[test]
fn parallel_jobs_keep_declaration_order() {
    let fixture = Fixture::new();
    let config = fixture.write_config(MIXED_TESTS);
    let mut command = run_command(config.clone(), OutputFormat::Text);
    command.jobs = Some(3);
    let (_, parallel) = run_to_string(&command);
    let (_, sequential) = run_to_string(&run_command(config, OutputFormat::Text));
    assert_eq!(parallel, sequential);
}

#[test]
fn json_report_separates_failed_and_errored() {
    let fixture = Fixture::new();
    let config = fixture.write_config(MIXED_TESTS);
    let (code, output) = run_to_string(&run_command(config, OutputFormat::Json));
    assert_eq!(code, EXIT_FAILED);
    let value: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(value["passed"], 1);
    assert_eq!(value["failed"], 1);
    assert_eq!(value["errored"], 1);
    let outcomes = value["outcomes"].as_array().unwrap();
    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0]["name"], "user count");
    assert_eq!(outcomes[0]["status"], "passed");
    assert_eq!(outcomes[1]["status"], "failed");
    assert_eq!(outcomes[2]["status"], "errored");
    assert!(!outcomes[2]["detail"].as_str().unwrap().is_empty());
}

#[test]
fn missing_config_is_an_environment_error() {
    let fixture = Fixture::new();
    let command = run_command(fixture.dir.path().join("absent.toml"), OutputFormat::Text);
    let mut out = Vec::new();
    let err = command_run(&command, &no_credentials(), &mut out).unwrap_err();
    assert!(err.to_string().contains("failed to load config"), "{err}");
    assert!(out.is_empty());
}

#[test]
fn postgres_source_without_credentials_is_an_environment_error() {
    let fixture = Fixture::new();
    let path = fixture.dir.path().join("pg.toml");
    fs::write(
        &path,
        "[[databases]]\nindex = 0\nhost = \"localhost\"\ndb_name = \"app\"\n",
    )
    .unwrap();
    let mut out = Vec::new();
    let err = command_run(&run_command(path, OutputFormat::Text), &no_credentials(), &mut out)
        .unwrap_err();
    assert!(err.to_string().contains("DBUSER0"), "{err}");
}

#[test]
fn overrides_replace_runner_settings_and_reject_bad_values() {
    let fixture = Fixture::new();
    let mut command = run_command(fixture.write_config(""), OutputFormat::Text);
    let base = SangatiConfig::load(command.config.as_deref()).unwrap().runner_config();

    command.jobs = Some(8);
    command.timeout_ms = Some(250);
    let runner = apply_overrides(base.clone(), &command).unwrap();
    assert_eq!(runner.max_workers, 8);
    assert_eq!(runner.query_timeout, Some(std::time::Duration::from_millis(250)));

    command.jobs = Some(0);
    assert!(apply_overrides(base.clone(), &command).is_err());
    command.jobs = Some(65);
    assert!(apply_overrides(base.clone(), &command).is_err());
    command.jobs = None;
    command.timeout_ms = Some(0);
    assert!(apply_overrides(base, &command).is_err());
}

// ============================================================================
// SECTION: Validate Command
// ============================================================================

#[test]
fn validate_reports_each_test() {
    let fixture = Fixture::new();
    let tests = r#"
[[tests]]
name = "ok"
types = ["int"]
queries = [{ db_index = 0, query = "SELECT 1" }]
operator = "eq"
values = ["1"]

[[tests]]
name = "bad literal"
types = ["date"]
queries = [{ db_index = 0, query = "SELECT d FROM t" }]
operator = "eq"
values = ["not-a-date"]

[[tests]]
name = "bad operator"
types = ["int"]
queries = [{ db_index = 0, query = "SELECT 1" }]
operator = "approx"
values = ["1"]

[[tests]]
name = "unknown source"
types = ["int"]
queries = [{ db_index = 0, query = "SELECT 1" }, { db_index = 7, query = "SELECT 1" }]
"#;
    let command = ValidateCommand {
        config: Some(fixture.write_config(tests)),
    };
    let mut out = Vec::new();
    let code = command_validate(&command, &mut out).unwrap();
    assert_eq!(code, EXIT_FAILED);
    let output = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines[0], "Test 'ok' OK");
    assert!(lines[1].starts_with("Test 'bad literal' INVALID: "), "{}", lines[1]);
    assert!(lines[2].contains("approx"), "{}", lines[2]);
    assert!(lines[3].contains("unconfigured database index 7"), "{}", lines[3]);
    assert_eq!(lines[4], "Total VALID: 1, Total INVALID: 3");
}

#[test]
fn validate_passes_a_clean_suite() {
    let fixture = Fixture::new();
    let command = ValidateCommand {
        config: Some(fixture.write_config(PASSING_TESTS)),
    };
    let mut out = Vec::new();
    assert_eq!(command_validate(&command, &mut out).unwrap(), EXIT_PASSED);
}

// ============================================================================
// SECTION: Source Registry
// ============================================================================

#[test]
fn registry_limits_concurrency_by_smallest_postgres_pool() {
    let config = SangatiConfig::from_toml_str(
        r#"
[[databases]]
index = 0
host = "localhost"
db_name = "app"
max_connections = 6

[[databases]]
index = 1
host = "localhost"
db_name = "audit"
max_connections = 2

[[databases]]
index = 2
type = "sqlite"
path = "local.db"
"#,
    )
    .unwrap();
    let credentials = CredentialSource::with_overrides(BTreeMap::from([(
        "DBUSER".to_string(),
        "app".to_string(),
    )]));
    let registry = SourceRegistry::from_config(&config, &credentials).unwrap();
    assert_eq!(registry.max_concurrency(), Some(2));
}

#[test]
fn sqlite_only_registry_has_no_concurrency_limit() {
    let fixture = Fixture::new();
    let config = SangatiConfig::load(Some(&fixture.write_config(""))).unwrap();
    let registry = SourceRegistry::from_config(&config, &no_credentials()).unwrap();
    assert_eq!(registry.max_concurrency(), None);
    assert!(registry.resolve(0).is_ok());
    assert!(registry.resolve(9).is_err());
}

#[test]
fn registry_routes_each_index_to_its_backend() {
    let fixture = Fixture::new();
    let mut toml = fixture.databases();
    toml.push_str(
        "[[databases]]\nindex = 4\nhost = \"127.0.0.1\"\nport = 1\ndb_name = \"app\"\nconnect_timeout_ms = 200\n",
    );
    let config = SangatiConfig::from_toml_str(&toml).unwrap();
    let credentials = CredentialSource::with_overrides(BTreeMap::from([(
        "DBUSER4".to_string(),
        "app".to_string(),
    )]));
    let registry = SourceRegistry::from_config(&config, &credentials).unwrap();
    assert!(registry.resolve(1).is_ok());
    assert!(matches!(registry.resolve(4), Err(ExecutionError::Connection(_))));
    assert!(matches!(registry.resolve(5), Err(ExecutionError::DataSourceNotFound(5))));
}
