//! CLI command implementations.

pub mod migrate;
pub mod seed;
pub mod user;

use secrecy::SecretString;
use sqlx::SqlitePool;

use tamarind_server::db;

/// Errors shared by the CLI commands.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Repository(#[from] db::RepositoryError),

    #[error("{0}")]
    Invalid(String),
}

/// Connect to the database named by `TAMARIND_DATABASE_URL` (or
/// `DATABASE_URL`), creating the file if needed.
pub(crate) async fn connect() -> Result<SqlitePool, CliError> {
    dotenvy::dotenv().ok();

    let url = std::env::var("TAMARIND_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| CliError::MissingEnvVar("TAMARIND_DATABASE_URL"))?;

    Ok(db::create_pool(&SecretString::from(url)).await?)
}
