//! # TCR SQLite store
//!
//! SQLite persistence backend for the TCR indexer. [`Store`] wraps a
//! connection pool and implements every persistence port of
//! `tcr-processor`, one module per entity family:
//!
//! - Listings (with typed field-level patch updates)
//! - Challenges, polls and appeals
//! - Parameter proposals (parameterizer and government families)
//! - Token purchases and transfers (append-only)
//! - Governance audit records (append-only)
//! - Multisig wallets and owner memberships
//! - Content revisions
//! - The watermark cursor

#![warn(missing_docs)]

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

pub mod audit;
pub mod challenge;
pub(crate) mod codec;
pub mod content;
pub mod cursor;
pub mod listing;
pub mod multisig;
pub mod proposal;
pub mod token;

/// SQLite-backed store for the indexer.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Connect to the database at the given URL with default pool limits.
    ///
    /// Creates the database file if it does not exist. Call
    /// [`Store::run_migrations`] before first use.
    pub async fn new(database_url: &str) -> Result<Self> {
        Self::connect(database_url, 5, 1).await
    }

    /// Connect with explicit pool limits.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        info!("Connecting to database: {}", database_url);

        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        info!("Database connection established");

        Ok(Self { pool })
    }

    /// Connect to a database file by path.
    pub async fn new_with_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let database_url = format!("sqlite://{}", path.display());
        Self::new(&database_url).await
    }

    /// Run database migrations.
    ///
    /// Call once during initialization to bring the schema up to date.
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run migrations")?;

        info!("Migrations completed successfully");

        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the connection pool.
    pub async fn close(&self) {
        info!("Closing database connection");
        self.pool.close().await;
    }

    /// Check database health.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("Database health check failed")?;

        Ok(())
    }

    /// Get database statistics.
    pub async fn stats(&self) -> Result<DatabaseStats> {
        let listing_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM listings")
            .fetch_one(&self.pool)
            .await?;

        let challenge_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM challenges")
            .fetch_one(&self.pool)
            .await?;

        let governance_event_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM governance_events")
                .fetch_one(&self.pool)
                .await?;

        let watermark_timestamp: Option<i64> =
            sqlx::query_scalar("SELECT timestamp FROM cursor WHERE id = 1")
                .fetch_optional(&self.pool)
                .await?;

        Ok(DatabaseStats {
            listing_count: listing_count as u64,
            challenge_count: challenge_count as u64,
            governance_event_count: governance_event_count as u64,
            watermark_timestamp,
        })
    }
}

/// Database statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseStats {
    /// Total number of listings.
    pub listing_count: u64,

    /// Total number of challenges.
    pub challenge_count: u64,

    /// Total number of governance audit records.
    pub governance_event_count: u64,

    /// Timestamp of the persisted watermark, if one has been saved.
    pub watermark_timestamp: Option<i64>,
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Store;
    use tempfile::NamedTempFile;

    pub async fn setup_store() -> (Store, NamedTempFile) {
        let temp_db = NamedTempFile::new().unwrap();
        let store = Store::new_with_path(temp_db.path()).await.unwrap();
        store.run_migrations().await.unwrap();
        (store, temp_db)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::setup_store;

    #[tokio::test]
    async fn test_store_creation() {
        let (store, _temp_db) = setup_store().await;

        store.health_check().await.unwrap();

        store.close().await;
    }

    #[tokio::test]
    async fn test_database_stats() {
        let (store, _temp_db) = setup_store().await;

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.listing_count, 0);
        assert_eq!(stats.challenge_count, 0);
        assert_eq!(stats.governance_event_count, 0);
        assert_eq!(stats.watermark_timestamp, None);

        store.close().await;
    }
}
