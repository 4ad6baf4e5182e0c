//! Database migration command.

use tamarind_server::db::MIGRATOR;

use super::{CliError, connect};

/// Apply pending migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CliError> {
    let pool = connect().await?;

    tracing::info!("Applying migrations...");
    MIGRATOR.run(&pool).await?;
    tracing::info!("Migrations up to date");

    Ok(())
}
