// crates/sangati-config/src/config.rs
// ============================================================================
// Module: Sangati Configuration
// Description: Configuration loading and validation for Sangati runs.
// Purpose: Provide strict config parsing with hard limits.
// Dependencies: sangati-core, serde, serde_json, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file, or from a JSON file when the
//! path ends in `.json`. JSON files may use the legacy `PascalCase` keys
//! (`Databases`, `DbName`, `DbIndex` and so on) which are accepted as aliases.
//!
//! The config layer validates data sources and runner settings only. Test
//! specifications are decoded but left to the core validator so that a
//! malformed spec fails itself instead of the whole run.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use sangati_core::RunnerConfig;
use sangati_core::TestSpec;
use sangati_core::runtime::MAX_WORKERS;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "sangati.toml";
/// Environment variable naming the configuration file.
pub const CONFIG_ENV_VAR: &str = "SANGATI_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum pooled connections per data source.
pub(crate) const MAX_POOL_CONNECTIONS: u32 = 64;
/// Default Postgres port.
pub(crate) const DEFAULT_POSTGRES_PORT: u16 = 5432;

// ============================================================================
// SECTION: Config Root
// ============================================================================

/// Sangati configuration loaded from disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SangatiConfig {
    /// Runner settings.
    #[serde(default)]
    pub runner: RunnerSettings,
    /// Indexed data sources.
    #[serde(default, alias = "Databases")]
    pub databases: Vec<DatabaseConfig>,
    /// Test specifications in declaration order.
    #[serde(default, alias = "Tests")]
    pub tests: Vec<TestSpec>,
}

impl SangatiConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", resolved.display())))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        if is_json(&resolved) { Self::from_json_str(content) } else { Self::from_toml_str(content) }
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] when validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and
    /// [`ConfigError::Invalid`] when validation fails.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.runner.validate()?;
        let mut seen = BTreeSet::new();
        for database in &self.databases {
            if !seen.insert(database.index) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate database index {}",
                    database.index
                )));
            }
            database.validate()?;
        }
        for (position, test) in self.tests.iter().enumerate() {
            if test.name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("tests[{position}].name must be non-empty")));
            }
        }
        Ok(())
    }

    /// Returns the data source configured for `index`.
    #[must_use]
    pub fn database(&self, index: u32) -> Option<&DatabaseConfig> {
        self.databases.iter().find(|database| database.index == index)
    }

    /// Builds the runner configuration.
    #[must_use]
    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            max_workers: self.runner.max_workers,
            query_timeout: self.runner.query_timeout(),
        }
    }
}

// ============================================================================
// SECTION: Runner Settings
// ============================================================================

/// Runner settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerSettings {
    /// Maximum number of tests evaluated concurrently.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// Per-query timeout in milliseconds.
    #[serde(default)]
    pub query_timeout_ms: Option<u64>,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            query_timeout_ms: None,
        }
    }
}

impl RunnerSettings {
    /// Validates runner settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(1 ..= MAX_WORKERS).contains(&self.max_workers) {
            return Err(ConfigError::Invalid(format!(
                "runner.max_workers must be between 1 and {MAX_WORKERS}"
            )));
        }
        if self.query_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "runner.query_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the per-query timeout.
    #[must_use]
    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout_ms.map(Duration::from_millis)
    }
}

// ============================================================================
// SECTION: Data Sources
// ============================================================================

/// Supported data-source backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSourceType {
    /// `PostgreSQL` server.
    #[default]
    Postgres,
    /// Local `SQLite` database file.
    Sqlite,
}

/// One indexed data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Index referenced by test queries.
    #[serde(alias = "Index")]
    pub index: u32,
    /// Backend type.
    #[serde(rename = "type", default)]
    pub source_type: DataSourceType,
    /// Postgres host.
    #[serde(default, alias = "Host")]
    pub host: Option<String>,
    /// Postgres port.
    #[serde(default = "default_port", alias = "Port")]
    pub port: u16,
    /// Postgres database name.
    #[serde(default, alias = "DbName")]
    pub db_name: Option<String>,
    /// `SQLite` database path.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Maximum pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Connection timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl DatabaseConfig {
    /// Validates backend-specific fields.
    fn validate(&self) -> Result<(), ConfigError> {
        let label = format!("databases[index={}]", self.index);
        if !(1 ..= MAX_POOL_CONNECTIONS).contains(&self.max_connections) {
            return Err(ConfigError::Invalid(format!(
                "{label}.max_connections must be between 1 and {MAX_POOL_CONNECTIONS}"
            )));
        }
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::Invalid(format!(
                "{label}.connect_timeout_ms must be greater than zero"
            )));
        }
        match self.source_type {
            DataSourceType::Postgres => {
                require_non_empty(&label, "host", self.host.as_deref())?;
                require_non_empty(&label, "db_name", self.db_name.as_deref())?;
                if self.port == 0 {
                    return Err(ConfigError::Invalid(format!("{label}.port must be non-zero")));
                }
                if self.path.is_some() {
                    return Err(ConfigError::Invalid(format!(
                        "{label}.path is only valid for sqlite"
                    )));
                }
            }
            DataSourceType::Sqlite => {
                let Some(path) = &self.path else {
                    return Err(ConfigError::Invalid(format!("{label}.path is required")));
                };
                validate_path_string(&format!("{label}.path"), &path.to_string_lossy())?;
                if self.host.is_some() || self.db_name.is_some() {
                    return Err(ConfigError::Invalid(format!(
                        "{label}.host and db_name are only valid for postgres"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Returns the connection timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML or JSON parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    if path.components().any(|component| component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH)
    {
        return Err(ConfigError::Invalid("config path component too long".to_string()));
    }
    Ok(())
}

/// Validates a configured path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    if Path::new(trimmed)
        .components()
        .any(|component| component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH)
    {
        return Err(ConfigError::Invalid(format!("{field} path component too long")));
    }
    Ok(())
}

/// Requires an optional string field to be present and non-blank.
fn require_non_empty(label: &str, field: &str, value: Option<&str>) -> Result<(), ConfigError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(()),
        _ => Err(ConfigError::Invalid(format!("{label}.{field} must be set"))),
    }
}

/// Returns true when the path names a JSON document.
fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|extension| extension.eq_ignore_ascii_case("json"))
}

/// Default worker count.
const fn default_max_workers() -> usize {
    1
}

/// Default Postgres port.
const fn default_port() -> u16 {
    DEFAULT_POSTGRES_PORT
}

/// Default pool size.
const fn default_max_connections() -> u32 {
    4
}

/// Default connection timeout in milliseconds.
const fn default_connect_timeout_ms() -> u64 {
    5_000
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions are permitted."
    )]

    use super::*;

    #[test]
    fn validate_path_string_rejects_blank() {
        assert!(validate_path_string("field", "   ").is_err());
    }

    #[test]
    fn validate_path_string_rejects_long_component() {
        let component = "a".repeat(MAX_PATH_COMPONENT_LENGTH + 1);
        let err = validate_path_string("databases.path", &format!("dir/{component}")).unwrap_err();
        assert!(err.to_string().contains("databases.path path component too long"));
    }

    #[test]
    fn validate_path_string_accepts_component_at_max() {
        let component = "a".repeat(MAX_PATH_COMPONENT_LENGTH);
        assert!(validate_path_string("field", &component).is_ok());
    }

    #[test]
    fn validate_path_rejects_total_length() {
        let path = PathBuf::from("a/".repeat(MAX_TOTAL_PATH_LENGTH));
        assert!(validate_path(&path).is_err());
    }

    #[test]
    fn explicit_path_wins_resolution() {
        let resolved = resolve_path(Some(Path::new("custom.toml"))).unwrap();
        assert_eq!(resolved, PathBuf::from("custom.toml"));
    }

    #[test]
    fn json_detection_is_extension_based() {
        assert!(is_json(Path::new("tests.json")));
        assert!(is_json(Path::new("dir/TESTS.JSON")));
        assert!(!is_json(Path::new("sangati.toml")));
        assert!(!is_json(Path::new("json")));
    }
}
