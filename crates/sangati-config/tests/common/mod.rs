// crates/sangati-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config loading and validation tests.
// Purpose: Reduce duplication across integration tests for sangati-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]
#![allow(
    clippy::panic,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only helpers may panic on misuse."
)]

use std::io::Write;

use sangati_config::ConfigError;
use sangati_config::SangatiConfig;
use tempfile::NamedTempFile;

/// Minimal TOML document with one postgres source and one test.
pub const MINIMAL_TOML: &str = r#"
[[databases]]
index = 0
host = "localhost"
db_name = "app"

[[tests]]
name = "row count"
types = ["int"]
queries = [{ db_index = 0, query = "select count(*) from users" }]
operator = "gte"
values = ["1"]
"#;

/// Parses a TOML string into a validated config.
pub fn config_from_toml(toml_str: &str) -> Result<SangatiConfig, ConfigError> {
    SangatiConfig::from_toml_str(toml_str)
}

/// Writes `content` to a temporary file with the given suffix.
pub fn write_temp(content: &str, suffix: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().expect("temp file");
    file.write_all(content.as_bytes()).expect("write config");
    file.flush().expect("flush config");
    file
}

/// Asserts that validation failed with a message containing `needle`.
pub fn assert_invalid(result: Result<SangatiConfig, ConfigError>, needle: &str) {
    match result {
        Err(ConfigError::Invalid(message)) => {
            assert!(message.contains(needle), "unexpected message: {message}");
        }
        other => panic!("expected invalid config, got {other:?}"),
    }
}
