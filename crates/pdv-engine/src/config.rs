//! # Engine Configuration
//!
//! Everything `Ledger::open` needs, read from the environment.
//!
//! ## Environment Variables
//! ```text
//! ┌──────────────────────────────────┬──────────────────────────┐
//! │ Variable                         │ Default                  │
//! ├──────────────────────────────────┼──────────────────────────┤
//! │ PDV_DATABASE_PATH                │ ./data/pdv-ledger.db     │
//! │ PDV_DB_MAX_CONNECTIONS           │ 5                        │
//! │ PDV_EVENT_CAPACITY               │ 256                      │
//! │ PDV_SIDE_EFFECT_LOG_CAPACITY     │ 100                      │
//! │ PDV_HUB_BIND_ADDR                │ 0.0.0.0                  │
//! │ PDV_HUB_PORT                     │ 8766                     │
//! └──────────────────────────────────┴──────────────────────────┘
//! ```
//!
//! Unset or blank variables take the default. A value that does not parse
//! is an error rather than a silent fallback.

use std::path::PathBuf;
use std::str::FromStr;

use pdv_db::DbConfig;
use pdv_realtime::{HubConfig, DEFAULT_EVENT_CAPACITY, DEFAULT_HUB_PORT};
use thiserror::Error;
use tracing::debug;

use crate::side_effects::DEFAULT_SIDE_EFFECT_CAPACITY;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable holds a value that does not parse.
    #[error("Invalid value for {var}: '{value}'")]
    InvalidValue { var: &'static str, value: String },
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// SQLite database file.
    pub database_path: PathBuf,
    /// Pool size.
    pub max_connections: u32,
    /// Events buffered per subscriber before the oldest are dropped.
    pub event_capacity: usize,
    /// Failed side effects kept in memory.
    pub side_effect_log_capacity: usize,
    /// WebSocket hub settings, used by `Ledger::start_hub`.
    pub hub: HubConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            database_path: PathBuf::from("./data/pdv-ledger.db"),
            max_connections: 5,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            side_effect_log_capacity: DEFAULT_SIDE_EFFECT_CAPACITY,
            hub: HubConfig {
                port: DEFAULT_HUB_PORT,
                bind_addr: "0.0.0.0".to_string(),
            },
        }
    }
}

impl LedgerConfig {
    /// Reads the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable
    /// name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = LedgerConfig::default();

        if let Some(path) = non_blank(&lookup, "PDV_DATABASE_PATH") {
            debug!(path = %path, "Database path from environment");
            config.database_path = PathBuf::from(path);
        }
        if let Some(max) = parse_var(&lookup, "PDV_DB_MAX_CONNECTIONS")? {
            config.max_connections = positive("PDV_DB_MAX_CONNECTIONS", max)?;
        }
        if let Some(capacity) = parse_var(&lookup, "PDV_EVENT_CAPACITY")? {
            config.event_capacity = positive("PDV_EVENT_CAPACITY", capacity)?;
        }
        if let Some(capacity) = parse_var(&lookup, "PDV_SIDE_EFFECT_LOG_CAPACITY")? {
            config.side_effect_log_capacity = capacity;
        }
        if let Some(addr) = non_blank(&lookup, "PDV_HUB_BIND_ADDR") {
            config.hub.bind_addr = addr;
        }
        if let Some(port) = parse_var(&lookup, "PDV_HUB_PORT")? {
            config.hub.port = port;
        }

        Ok(config)
    }

    /// Store configuration derived from this config.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path.clone()).max_connections(self.max_connections)
    }
}

fn non_blank<F>(lookup: &F, var: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match non_blank(lookup, var) {
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var, value }),
        None => Ok(None),
    }
}

fn positive<T>(var: &'static str, value: T) -> Result<T, ConfigError>
where
    T: PartialOrd + Default + ToString,
{
    if value > T::default() {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue {
            var,
            value: value.to_string(),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.database_path, PathBuf::from("./data/pdv-ledger.db"));
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.event_capacity, 256);
        assert_eq!(config.side_effect_log_capacity, 100);
        assert_eq!(config.hub.port, 8766);
    }

    #[test]
    fn test_overrides() {
        let config = LedgerConfig::from_lookup(lookup(&[
            ("PDV_DATABASE_PATH", "/srv/pdv/ledger.db"),
            ("PDV_DB_MAX_CONNECTIONS", "8"),
            ("PDV_EVENT_CAPACITY", "32"),
            ("PDV_SIDE_EFFECT_LOG_CAPACITY", "0"),
            ("PDV_HUB_PORT", "9001"),
            ("PDV_HUB_BIND_ADDR", "127.0.0.1"),
        ]))
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/srv/pdv/ledger.db"));
        assert_eq!(config.db_config().max_connections, 8);
        assert_eq!(config.event_capacity, 32);
        assert_eq!(config.side_effect_log_capacity, 0);
        assert_eq!(config.hub.bind_address(), "127.0.0.1:9001");
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = LedgerConfig::from_lookup(lookup(&[("PDV_DB_MAX_CONNECTIONS", "  ")])).unwrap();
        assert_eq!(config.max_connections, 5);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = LedgerConfig::from_lookup(lookup(&[("PDV_EVENT_CAPACITY", "lots")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var: "PDV_EVENT_CAPACITY", .. }));

        let err = LedgerConfig::from_lookup(lookup(&[("PDV_DB_MAX_CONNECTIONS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var: "PDV_DB_MAX_CONNECTIONS", .. }));
    }
}
