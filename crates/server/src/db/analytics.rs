//! Read-only dashboard aggregates.
//!
//! Money columns are decimal text, so sums happen in Rust rather than in
//! SQL where SQLite would coerce them to floats.

use std::collections::BTreeMap;

use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{Row, SqlitePool};

use tamarind_core::ProductId;

use super::{RepositoryError, parse_money};

/// How far back the daily sales series reaches, today inclusive.
const DAILY_SALES_DAYS: u64 = 7;

/// How many best sellers the summary carries.
const TOP_PRODUCT_LIMIT: i64 = 5;

/// Dashboard summary.
#[derive(Debug, Serialize)]
pub struct Summary {
    pub product_count: i64,
    pub order_count: i64,
    pub low_stock_count: i64,
    pub today_sales: Decimal,
    /// Oldest day first, zero-filled for days without sales.
    pub daily_sales: Vec<DailySales>,
    pub top_products: Vec<TopProduct>,
}

#[derive(Debug, Serialize)]
pub struct DailySales {
    pub date: NaiveDate,
    pub total: Decimal,
}

#[derive(Debug, Serialize)]
pub struct TopProduct {
    pub product_id: ProductId,
    pub name: String,
    pub quantity_sold: i64,
}

/// Compute the dashboard summary.
///
/// # Errors
///
/// Returns `RepositoryError::Database` on query failure and
/// `RepositoryError::DataCorruption` for an unparseable money column.
pub async fn summary(pool: &SqlitePool) -> Result<Summary, RepositoryError> {
    let product_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
        .fetch_one(pool)
        .await?;

    let order_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(pool)
        .await?;

    let low_stock_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE stock <= min_stock")
            .fetch_one(pool)
            .await?;

    let today = Utc::now().date_naive();
    let window_start = today
        .checked_sub_days(Days::new(DAILY_SALES_DAYS - 1))
        .unwrap_or(today);

    let rows = sqlx::query("SELECT created_at, total FROM orders WHERE created_at >= ?")
        .bind(window_start.and_hms_opt(0, 0, 0).map(|t| t.and_utc()))
        .fetch_all(pool)
        .await?;

    let mut per_day: BTreeMap<NaiveDate, Decimal> = (0..DAILY_SALES_DAYS)
        .filter_map(|offset| window_start.checked_add_days(Days::new(offset)))
        .map(|day| (day, Decimal::ZERO))
        .collect();

    for row in rows {
        let created_at: DateTime<Utc> = row.try_get("created_at")?;
        let raw_total: String = row.try_get("total")?;
        let total = parse_money("total", &raw_total)?;
        if let Some(bucket) = per_day.get_mut(&created_at.date_naive()) {
            *bucket += total;
        }
    }

    let today_sales = per_day.get(&today).copied().unwrap_or(Decimal::ZERO);

    let daily_sales = per_day
        .into_iter()
        .map(|(date, total)| DailySales { date, total })
        .collect();

    let top_rows = sqlx::query(
        "SELECT oi.product_id, COALESCE(p.name, oi.product_id) AS name,
                SUM(oi.quantity) AS quantity_sold
         FROM order_items oi
         LEFT JOIN products p ON p.id = oi.product_id
         GROUP BY oi.product_id
         ORDER BY quantity_sold DESC
         LIMIT ?",
    )
    .bind(TOP_PRODUCT_LIMIT)
    .fetch_all(pool)
    .await?;

    let top_products = top_rows
        .into_iter()
        .map(|row| {
            Ok(TopProduct {
                product_id: ProductId::from(row.try_get::<String, _>("product_id")?),
                name: row.try_get("name")?,
                quantity_sold: row.try_get("quantity_sold")?,
            })
        })
        .collect::<Result<_, sqlx::Error>>()?;

    Ok(Summary {
        product_count,
        order_count,
        low_stock_count,
        today_sales,
        daily_sales,
        top_products,
    })
}
