//! Configuration management

use blotter_common::BlotterError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::error::{IngestError, Result};

// ============================================================================
// Ingestion Configuration Constants
// ============================================================================

/// Public incident feed.
pub const DEFAULT_API_URL: &str = "https://polisen.se/api/events";

/// Upper bound for the single fetch attempt, in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/blotter";

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Staging table rebuilt on every load.
pub const DEFAULT_STAGING_TABLE: &str = "police_events_staging";

/// Fact table produced by the transformation layer, read by reports.
pub const DEFAULT_REPORT_TABLE: &str = "mart.fct_police_events";

/// Ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub fetch: FetchConfig,
    pub database: DatabaseConfig,
    pub staging_table: String,
    pub report_table: String,
}

/// Incident API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    pub url: String,
    pub timeout_secs: u64,
}

/// Warehouse connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub connect_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment and defaults
    ///
    /// Not validated here; apply [`Overrides`] first, then call
    /// [`Config::validate`].
    pub fn load() -> Self {
        dotenvy::dotenv().ok();

        Config {
            fetch: FetchConfig {
                url: env_or("BLOTTER_API_URL", DEFAULT_API_URL),
                timeout_secs: env_parse("BLOTTER_FETCH_TIMEOUT_SECS", DEFAULT_FETCH_TIMEOUT_SECS),
            },
            database: DatabaseConfig {
                url: env_or("DATABASE_URL", DEFAULT_DATABASE_URL),
                connect_timeout_secs: env_parse(
                    "DATABASE_CONNECT_TIMEOUT",
                    DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                ),
            },
            staging_table: env_or("BLOTTER_STAGING_TABLE", DEFAULT_STAGING_TABLE),
            report_table: env_or("BLOTTER_REPORT_TABLE", DEFAULT_REPORT_TABLE),
        }
    }

    /// Replace environment values with those given on the command line
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(url) = overrides.api_url {
            self.fetch.url = url;
        }
        if let Some(secs) = overrides.timeout_secs {
            self.fetch.timeout_secs = secs;
        }
        if let Some(url) = overrides.database_url {
            self.database.url = url;
        }
        if let Some(table) = overrides.staging_table {
            self.staging_table = table;
        }
        if let Some(table) = overrides.report_table {
            self.report_table = table;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.fetch.url.trim().is_empty() {
            return Err(IngestError::config("API URL cannot be empty"));
        }

        if self.fetch.timeout_secs == 0 {
            return Err(IngestError::config("Fetch timeout must be greater than 0"));
        }

        if self.database.url.trim().is_empty() {
            return Err(IngestError::config("Database URL cannot be empty"));
        }

        if self.database.connect_timeout_secs == 0 {
            return Err(IngestError::config(
                "Database connect timeout must be greater than 0",
            ));
        }

        validate_table_identifier(&self.staging_table)?;
        validate_table_identifier(&self.report_table)?;

        Ok(())
    }
}

/// Command-line settings; each one that is set wins over the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub database_url: Option<String>,
    pub staging_table: Option<String>,
    pub report_table: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetch: FetchConfig {
                url: DEFAULT_API_URL.to_string(),
                timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            },
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
            },
            staging_table: DEFAULT_STAGING_TABLE.to_string(),
            report_table: DEFAULT_REPORT_TABLE.to_string(),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[allow(clippy::expect_used)]
fn table_identifier_re() -> &'static Regex {
    static TABLE_IDENTIFIER_RE: OnceLock<Regex> = OnceLock::new();
    TABLE_IDENTIFIER_RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
            .expect("valid table identifier regex")
    })
}

/// Table names are spliced into SQL text, so only plain `[schema.]table`
/// identifiers are accepted.
pub fn validate_table_identifier(name: &str) -> std::result::Result<(), BlotterError> {
    if table_identifier_re().is_match(name) {
        Ok(())
    } else {
        Err(BlotterError::InvalidIdentifier(format!(
            "'{}' is not a valid [schema.]table name",
            name
        )))
    }
}
