//! Environment-based configuration.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ExpectError, Result};

/// Environment configuration prefix.
pub const DEFAULT_PREFIX: &str = "SCELL";

/// Environment variable reader.
///
/// Values set through [`EnvConfig::set`] shadow the process environment
/// for this reader only.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Prefix for environment variables.
    prefix: String,
    /// Values that take precedence over the process environment.
    overrides: HashMap<String, String>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl EnvConfig {
    /// Create a new environment config reader.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            overrides: HashMap::new(),
        }
    }

    /// Build the full environment variable name.
    #[must_use]
    pub fn var_name(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_uppercase()
        } else {
            format!("{}_{}", self.prefix, name.to_uppercase())
        }
    }

    /// Get a string value. Empty values count as unset.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        let var_name = self.var_name(name);
        self.overrides
            .get(&var_name)
            .cloned()
            .or_else(|| std::env::var(&var_name).ok())
            .filter(|v| !v.is_empty())
    }

    /// Get a value that must be present.
    pub fn require(&self, name: &str) -> Result<String> {
        self.get(name).ok_or_else(|| {
            ExpectError::config(format!(
                "environment variable {} is not set",
                self.var_name(name)
            ))
        })
    }

    /// Get a parsed value, failing if it is present but malformed.
    pub fn parse<T>(&self, name: &str) -> Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(name)
            .map(|v| {
                v.parse().map_err(|e| {
                    ExpectError::config(format!(
                        "invalid value {v:?} for {}: {e}",
                        self.var_name(name)
                    ))
                })
            })
            .transpose()
    }

    /// Get a duration given in whole seconds.
    pub fn duration_secs(&self, name: &str) -> Result<Option<Duration>> {
        Ok(self.parse::<u64>(name)?.map(Duration::from_secs))
    }

    /// Get a filesystem path.
    #[must_use]
    pub fn path(&self, name: &str) -> Option<PathBuf> {
        self.get(name).map(PathBuf::from)
    }

    /// Shadow a value for this reader.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let var_name = self.var_name(name);
        self.overrides.insert(var_name, value.into());
    }
}

/// Variables read by the harness.
pub mod vars {
    /// Path to the scell executable under test.
    pub const BIN: &str = "BIN";
    /// Default expect timeout in seconds.
    pub const TIMEOUT: &str = "TIMEOUT";
    /// Directory holding the scenario fixtures.
    pub const DATA_DIR: &str = "DATA_DIR";
}
