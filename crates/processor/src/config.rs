//! Configuration management for the indexer.
//!
//! Loads from a TOML file with serde defaults; the database URL may be
//! overridden through the `TCR_DATABASE_URL` environment variable so
//! credentials stay out of config files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable overriding `database.url`.
pub const DATABASE_URL_ENV: &str = "TCR_DATABASE_URL";

/// Main configuration for the indexer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database configuration.
    pub database: DatabaseConfig,

    /// Poll-loop configuration.
    #[serde(default)]
    pub poll: PollConfig,

    /// Publisher configuration.
    #[serde(default)]
    pub publisher: PublisherConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file, applying env overrides.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            config.database.url = url;
        }
        Ok(config)
    }
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL (e.g. "sqlite://tcr.db").
    pub url: String,

    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Poll-loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Interval in seconds between event-source polls.
    #[serde(default = "default_poll_interval_secs")]
    pub interval_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval_secs(),
        }
    }
}

/// Publisher configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Topic to publish to. Publishing is disabled when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    1
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [database]
            url = "sqlite://tcr.db"
            "#,
        )
        .unwrap();

        assert_eq!(config.database.url, "sqlite://tcr.db");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.poll.interval_secs, 60);
        assert_eq!(config.publisher.topic, None);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn full_config_round_trips() {
        let config: Config = toml::from_str(
            r#"
            [database]
            url = "sqlite://other.db"
            max_connections = 10

            [poll]
            interval_secs = 5

            [publisher]
            topic = "governance-events"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.poll.interval_secs, 5);
        assert_eq!(config.publisher.topic.as_deref(), Some("governance-events"));
        assert_eq!(config.logging.level, "debug");
    }
}
