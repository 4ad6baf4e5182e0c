//! Database access for the POS SQLite store.
//!
//! # Tables
//!
//! - `users` - accounts and password credentials
//! - `products` - catalog with tiered pricing and stock
//! - `orders` / `order_items` - committed orders (blob + normalized rows)
//! - `inventory_log` - append-only stock audit trail
//! - `settings` - key-value store configuration
//!
//! # Migrations
//!
//! Migrations are embedded from `crates/server/migrations/` and applied on
//! startup (and by `tamarind-cli migrate`).
//!
//! Repositories are modules of free functions taking an executor, so the
//! checkout orchestrator can run them inside a single transaction.

pub mod analytics;
pub mod inventory;
pub mod orders;
pub mod products;
pub mod settings;
pub mod users;

use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use sqlx::SqlitePool;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

/// Embedded migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!();

/// Error type for repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Unique-key violation translated at the store layer so handlers can
    /// answer with a 4xx instead of a generic server error.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Create a `SQLite` connection pool with sensible defaults.
///
/// The database file is created if missing.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url.expose_secret())?
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
}

/// Create an in-memory pool with migrations applied.
///
/// A single never-expiring connection, since every new in-memory connection
/// would otherwise see an empty database. Used by tests.
///
/// # Errors
///
/// Returns `sqlx::Error` if the pool cannot be created or migrations fail.
pub async fn create_in_memory_pool() -> Result<SqlitePool, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    MIGRATOR.run(&pool).await?;

    Ok(pool)
}

/// Parse a money column stored as TEXT.
pub(crate) fn parse_money(column: &str, raw: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(raw).map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid decimal in {column}: {e}"))
    })
}

/// Translate a unique-key violation into `Conflict`, passing other errors on.
pub(crate) fn map_unique_violation(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}
