//! Inventory ledger repository.
//!
//! Append and list only. There is deliberately no update or delete here:
//! the ledger is the audit trail for every stock mutation.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

use tamarind_core::ProductId;

use super::RepositoryError;
use crate::models::LedgerEntry;

/// One entry to append.
#[derive(Debug)]
pub struct NewLedgerEntry<'a> {
    pub action: &'a str,
    pub product_id: &'a ProductId,
    pub product_name: &'a str,
    pub quantity_change: i64,
    /// Stock balance resulting from this mutation, read inside the same
    /// transaction that performed it.
    pub new_stock: i64,
    /// Order id or operator note explaining the mutation.
    pub reference: &'a str,
}

fn entry_from_row(row: &SqliteRow) -> Result<LedgerEntry, RepositoryError> {
    Ok(LedgerEntry {
        id: row.try_get("id")?,
        action: row.try_get("action")?,
        product_id: ProductId::new(row.try_get("product_id")?),
        product_name: row.try_get("product_name")?,
        quantity_change: row.try_get("quantity_change")?,
        new_stock: row.try_get("new_stock")?,
        reference: row.try_get("reference")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

/// Append a ledger entry.
///
/// Takes a connection so checkout and cancellation can append inside their
/// transactions.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn append(
    conn: &mut SqliteConnection,
    entry: &NewLedgerEntry<'_>,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO inventory_log
            (action, product_id, product_name, quantity_change, new_stock, reference, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(entry.action)
    .bind(entry.product_id.as_str())
    .bind(entry.product_name)
    .bind(entry.quantity_change)
    .bind(entry.new_stock)
    .bind(entry.reference)
    .bind(Utc::now())
    .execute(conn)
    .await?;

    Ok(())
}

/// List ledger entries, newest first.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list(pool: &SqlitePool, limit: i64) -> Result<Vec<LedgerEntry>, RepositoryError> {
    let rows = sqlx::query(
        "SELECT id, action, product_id, product_name, quantity_change, new_stock,
                reference, created_at
         FROM inventory_log
         ORDER BY id DESC
         LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter().map(entry_from_row).collect()
}
