//! # Rollbook Configuration
//!
//! A minimal string key/value store. Typed config structs in the other
//! crates (`AllocatorConfig`, `CredentialConfig`, `HasherConfig`) read
//! their overrides from a [`RollConfigSnapshot`].
//!
//! ## Setting and reading values
//! ```rust
//! use roll_core::RollConfig;
//! let mut config = RollConfig::new();
//!
//! config.set("allocator.max_attempts", "5");
//!
//! let snapshot = config.snapshot();
//! assert_eq!(snapshot.get_u32("allocator.max_attempts").ok(), Some(Some(5)));
//! ```
//!
//! ## Environment overrides
//! `load_env("ROLL__")` maps `ROLL__ALLOCATOR__MAX_ATTEMPTS=5` to
//! `allocator.max_attempts = 5`.
//!
//! ```bash
//! export ROLL__HASHER__COST=12
//! ```

use std::collections::HashMap;
use std::str::FromStr;

use crate::errors::{RollError, RollResult};

#[derive(Debug, Default)]
pub struct RollConfig {
    values: HashMap<String, String>,
}

impl RollConfig {
    /// Create an empty config store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Set a configuration key to a string value.
    ///
    /// Example: config.set("credentials.password_length", "10")
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    /// Get a configuration value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    /// Check whether a key is present.
    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Import every environment variable starting with `prefix`.
    pub fn load_env(&mut self, prefix: &str) {
        self.load_vars(prefix, std::env::vars());
    }

    /// Same as [`RollConfig::load_env`] over an explicit variable list.
    pub fn load_vars<I>(&mut self, prefix: &str, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(prefix) {
                // ROLL__ALLOCATOR__MAX_ATTEMPTS → allocator.max_attempts
                let normalized = stripped.to_lowercase().replace("__", ".");
                self.set(normalized, value);
            }
        }
    }

    pub fn snapshot(&self) -> RollConfigSnapshot {
        RollConfigSnapshot::new(self.values.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RollConfigSnapshot {
    map: HashMap<String, String>,
}

impl RollConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_u32(&self, key: &str) -> RollResult<Option<u32>> {
        self.parse(key)
    }

    pub fn get_u64(&self, key: &str) -> RollResult<Option<u64>> {
        self.parse(key)
    }

    pub fn get_usize(&self, key: &str) -> RollResult<Option<usize>> {
        self.parse(key)
    }

    pub fn get_bool(&self, key: &str) -> RollResult<Option<bool>> {
        self.parse(key)
    }

    /// A present but unparsable value is an error, never a silent default.
    fn parse<T: FromStr>(&self, key: &str) -> RollResult<Option<T>> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
                RollError::invalid_config(key, format!("cannot parse '{raw}'"))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_vars_are_normalized_into_dotted_keys() {
        let mut config = RollConfig::new();
        config.load_vars(
            "ROLL__",
            vec![
                ("ROLL__ALLOCATOR__MAX_ATTEMPTS".to_string(), "7".to_string()),
                ("OTHER__VALUE".to_string(), "ignored".to_string()),
            ],
        );

        assert_eq!(config.get("allocator.max_attempts"), Some("7"));
        assert!(!config.has("other.value"));
    }

    #[test]
    fn unparsable_values_are_rejected() {
        let mut config = RollConfig::new();
        config.set("hasher.cost", "twelve");
        let snapshot = config.snapshot();

        assert!(matches!(
            snapshot.get_u32("hasher.cost"),
            Err(RollError::InvalidConfig { .. })
        ));
        assert_eq!(snapshot.get_u32("missing").ok(), Some(None));
    }
}
