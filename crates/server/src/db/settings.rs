//! Settings key-value store.
//!
//! Plain string values. Guests see only the public subset the POS client
//! needs to render prices and receipts; everything else is owner-only.

use std::collections::BTreeMap;

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{Row, SqlitePool};

use super::RepositoryError;

/// Keys a guest may read without a token.
pub const PUBLIC_KEYS: &[&str] = &[
    "store_name",
    "currency",
    "discount_rate",
    "receipt_header",
    "receipt_footer",
];

/// Setting key holding the global checkout discount percentage.
pub const DISCOUNT_RATE_KEY: &str = "discount_rate";

/// Get all settings as a key-value map.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get_all(pool: &SqlitePool) -> Result<BTreeMap<String, String>, RepositoryError> {
    let rows = sqlx::query("SELECT key, value FROM settings")
        .fetch_all(pool)
        .await?;

    rows.iter()
        .map(|row| Ok((row.try_get("key")?, row.try_get("value")?)))
        .collect()
}

/// Get the guest-visible subset of settings.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get_public(pool: &SqlitePool) -> Result<BTreeMap<String, String>, RepositoryError> {
    let mut all = get_all(pool).await?;
    all.retain(|key, _| PUBLIC_KEYS.contains(&key.as_str()));
    Ok(all)
}

/// Get a single setting value.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get(pool: &SqlitePool, key: &str) -> Result<Option<String>, RepositoryError> {
    let value = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    Ok(value)
}

/// Upsert a batch of settings in one transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
pub async fn set_many(
    pool: &SqlitePool,
    entries: &BTreeMap<String, String>,
) -> Result<(), RepositoryError> {
    let mut tx = pool.begin().await?;

    for (key, value) in entries {
        sqlx::query(
            "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(())
}

/// Read the global discount rate as a percentage, clamped to 0..=100.
///
/// A missing or unparseable value means no discount; checkout must not fail
/// because an operator typo landed in the settings table.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn discount_rate(pool: &SqlitePool) -> Result<Decimal, RepositoryError> {
    let raw = get(pool, DISCOUNT_RATE_KEY).await?;

    let rate = raw
        .and_then(|v| v.parse::<Decimal>().ok())
        .unwrap_or(Decimal::ZERO);

    Ok(rate.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_in_memory_pool;
    use rust_decimal::dec;

    #[tokio::test]
    async fn upsert_and_public_subset() {
        let pool = create_in_memory_pool().await.unwrap();

        let mut entries = BTreeMap::new();
        entries.insert("store_name".to_owned(), "Tamarind Mart".to_owned());
        entries.insert("discount_rate".to_owned(), "5".to_owned());
        entries.insert("promptpay_id".to_owned(), "0812345678".to_owned());
        set_many(&pool, &entries).await.unwrap();

        let public = get_public(&pool).await.unwrap();
        assert_eq!(public.get("store_name").map(String::as_str), Some("Tamarind Mart"));
        assert!(!public.contains_key("promptpay_id"));

        entries.insert("store_name".to_owned(), "Tamarind Mart 2".to_owned());
        set_many(&pool, &entries).await.unwrap();
        assert_eq!(
            get(&pool, "store_name").await.unwrap().as_deref(),
            Some("Tamarind Mart 2")
        );
    }

    #[tokio::test]
    async fn discount_rate_defaults_and_clamps() {
        let pool = create_in_memory_pool().await.unwrap();
        assert_eq!(discount_rate(&pool).await.unwrap(), Decimal::ZERO);

        let mut entries = BTreeMap::new();
        entries.insert(DISCOUNT_RATE_KEY.to_owned(), "7.5".to_owned());
        set_many(&pool, &entries).await.unwrap();
        assert_eq!(discount_rate(&pool).await.unwrap(), dec!(7.5));

        entries.insert(DISCOUNT_RATE_KEY.to_owned(), "150".to_owned());
        set_many(&pool, &entries).await.unwrap();
        assert_eq!(discount_rate(&pool).await.unwrap(), dec!(100));

        entries.insert(DISCOUNT_RATE_KEY.to_owned(), "not a number".to_owned());
        set_many(&pool, &entries).await.unwrap();
        assert_eq!(discount_rate(&pool).await.unwrap(), Decimal::ZERO);
    }
}
