// crates/sangati-store-postgres/src/credentials.rs
// ============================================================================
// Module: Postgres Credentials
// Description: Environment-sourced database credentials.
// Purpose: Keep user names and passwords out of configuration files.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Credentials for the data source at index `N` are read from `DBUSER<N>` and
//! `DBPASS<N>`, falling back to the unsuffixed `DBUSER` and `DBPASS`. Lookups
//! can be served from an override map instead of the process environment.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use crate::source::PostgresSourceError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// User-name variable prefix.
pub const USER_VAR: &str = "DBUSER";
/// Password variable prefix.
pub const PASSWORD_VAR: &str = "DBPASS";

// ============================================================================
// SECTION: Credentials
// ============================================================================

/// Resolved login for one data source.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Login role.
    pub user: String,
    /// Password, when one is set.
    pub password: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Where credential variables are read from.
#[derive(Debug, Clone, Default)]
pub struct CredentialSource {
    /// Values taking precedence over process environment reads.
    overrides: Option<BTreeMap<String, String>>,
}

impl CredentialSource {
    /// Reads credentials from the process environment.
    #[must_use]
    pub const fn from_env() -> Self {
        Self {
            overrides: None,
        }
    }

    /// Reads credentials from `overrides` only.
    #[must_use]
    pub const fn with_overrides(overrides: BTreeMap<String, String>) -> Self {
        Self {
            overrides: Some(overrides),
        }
    }

    /// Resolves credentials for the data source at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`PostgresSourceError::MissingCredentials`] when no user name is
    /// set for the index or globally.
    pub fn credentials(&self, index: u32) -> Result<Credentials, PostgresSourceError> {
        let user = self
            .indexed(USER_VAR, index)
            .filter(|user| !user.trim().is_empty())
            .ok_or_else(|| {
                PostgresSourceError::MissingCredentials(format!(
                    "set {USER_VAR}{index} or {USER_VAR}"
                ))
            })?;
        Ok(Credentials {
            user,
            password: self.indexed(PASSWORD_VAR, index),
        })
    }

    /// Looks up `<prefix><index>`, then `<prefix>`.
    fn indexed(&self, prefix: &str, index: u32) -> Option<String> {
        self.lookup(&format!("{prefix}{index}")).or_else(|| self.lookup(prefix))
    }

    /// Reads one variable.
    fn lookup(&self, key: &str) -> Option<String> {
        match &self.overrides {
            Some(overrides) => overrides.get(key).cloned(),
            None => std::env::var(key).ok(),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
