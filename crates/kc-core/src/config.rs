//! Configuration management for Keycloak Rust.
//!
//! Configuration is loaded from environment variables (optionally seeded from a
//! `.env` file) with sensible defaults.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    pub min_connections: u32,
    /// Connection acquire timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl DatabaseConfig {
    /// Returns the connect timeout as a [`Duration`].
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/keycloak".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
        }
    }
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(Error::Config(format!("unknown log format '{other}'"))),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive, in `RUST_LOG` syntax.
    pub filter: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    ///
    /// | Variable                | Default                          |
    /// |-------------------------|----------------------------------|
    /// | `DATABASE_URL`          | `postgres://localhost/keycloak`  |
    /// | `KC_DB_MIN_CONNECTIONS` | `1`                              |
    /// | `KC_DB_MAX_CONNECTIONS` | `10`                             |
    /// | `KC_DB_CONNECT_TIMEOUT` | `30` (seconds)                   |
    /// | `RUST_LOG`              | `info`                           |
    /// | `KC_LOG_FORMAT`         | `text`                           |
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if a variable is present but cannot be parsed.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let database = DatabaseConfig {
            url: lookup("DATABASE_URL").unwrap_or(defaults.database.url),
            min_connections: parse_var(&lookup, "KC_DB_MIN_CONNECTIONS")?
                .unwrap_or(defaults.database.min_connections),
            max_connections: parse_var(&lookup, "KC_DB_MAX_CONNECTIONS")?
                .unwrap_or(defaults.database.max_connections),
            connect_timeout_secs: parse_var(&lookup, "KC_DB_CONNECT_TIMEOUT")?
                .unwrap_or(defaults.database.connect_timeout_secs),
        };

        if database.min_connections > database.max_connections {
            return Err(Error::Config(format!(
                "KC_DB_MIN_CONNECTIONS ({}) exceeds KC_DB_MAX_CONNECTIONS ({})",
                database.min_connections, database.max_connections
            )));
        }

        let logging = LoggingConfig {
            filter: lookup("RUST_LOG").unwrap_or(defaults.logging.filter),
            format: parse_var(&lookup, "KC_LOG_FORMAT")?.unwrap_or(defaults.logging.format),
        };

        Ok(Self { database, logging })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|_| Error::Config(format!("invalid value for {key}: '{raw}'")))
        })
        .transpose()
}
