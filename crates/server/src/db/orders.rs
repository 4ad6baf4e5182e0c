//! Order repository.
//!
//! Orders are stored twice by design: the serialized `items` blob on the
//! order row for fast reconstruction, and normalized `order_items` rows for
//! aggregation and cancellation. Both are written in the same transaction.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqliteExecutor, SqlitePool};

use tamarind_core::{OrderId, OrderStatus, ProductId};

use super::{RepositoryError, parse_money};
use crate::models::{Order, OrderLine};

fn order_from_row(row: &SqliteRow) -> Result<Order, RepositoryError> {
    let items_raw: String = row.try_get("items")?;
    let items: Vec<OrderLine> = serde_json::from_str(&items_raw).map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid items blob in order: {e}"))
    })?;

    let status_raw: String = row.try_get("status")?;
    let status = OrderStatus::from_str(&status_raw).map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid status in database: {e}"))
    })?;

    Ok(Order {
        id: OrderId::new(row.try_get("id")?),
        items,
        subtotal: parse_money("subtotal", &row.try_get::<String, _>("subtotal")?)?,
        discount: parse_money("discount", &row.try_get::<String, _>("discount")?)?,
        total: parse_money("total", &row.try_get::<String, _>("total")?)?,
        payment_method: row.try_get("payment_method")?,
        status,
        notes: row.try_get("notes")?,
        slip_image: row.try_get("slip_image")?,
        created_by: row.try_get("created_by")?,
        customer_name: row.try_get("customer_name")?,
        customer_address: row.try_get("customer_address")?,
        customer_phone: row.try_get("customer_phone")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

const ORDER_COLUMNS: &str = "id, items, subtotal, discount, total, payment_method, status, \
     notes, slip_image, created_by, customer_name, customer_address, customer_phone, created_at";

/// List recent orders, newest first.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list_recent(pool: &SqlitePool, limit: i64) -> Result<Vec<Order>, RepositoryError> {
    let rows = sqlx::query(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id DESC LIMIT ?"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter().map(order_from_row).collect()
}

/// Get an order by id.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get<'e>(
    exec: impl SqliteExecutor<'e>,
    id: &OrderId,
) -> Result<Option<Order>, RepositoryError> {
    let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"))
        .bind(id.as_str())
        .fetch_optional(exec)
        .await?;

    row.as_ref().map(order_from_row).transpose()
}

/// Insert an order and its line rows inside an open transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if an insert fails.
pub async fn insert(conn: &mut SqliteConnection, order: &Order) -> Result<(), RepositoryError> {
    let items_blob = serde_json::to_string(&order.items).map_err(|e| {
        RepositoryError::DataCorruption(format!("unserializable order items: {e}"))
    })?;

    sqlx::query(
        "INSERT INTO orders
            (id, items, subtotal, discount, total, payment_method, status, notes,
             slip_image, created_by, customer_name, customer_address, customer_phone, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(order.id.as_str())
    .bind(items_blob)
    .bind(order.subtotal.to_string())
    .bind(order.discount.to_string())
    .bind(order.total.to_string())
    .bind(&order.payment_method)
    .bind(order.status.to_string())
    .bind(&order.notes)
    .bind(order.slip_image.as_deref())
    .bind(order.created_by.as_deref())
    .bind(order.customer_name.as_deref())
    .bind(order.customer_address.as_deref())
    .bind(order.customer_phone.as_deref())
    .bind(order.created_at)
    .execute(&mut *conn)
    .await?;

    for line in &order.items {
        sqlx::query(
            "INSERT INTO order_items (order_id, product_id, quantity, price_at_time, cost_at_time)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(order.id.as_str())
        .bind(line.product_id.as_str())
        .bind(line.quantity)
        .bind(line.unit_price.to_string())
        .bind(line.unit_cost.to_string())
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// A normalized order line row, as needed for stock restoration.
#[derive(Debug)]
pub struct OrderItemRow {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Fetch the normalized line rows for an order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list_items(
    conn: &mut SqliteConnection,
    id: &OrderId,
) -> Result<Vec<OrderItemRow>, RepositoryError> {
    let rows = sqlx::query("SELECT product_id, quantity FROM order_items WHERE order_id = ?")
        .bind(id.as_str())
        .fetch_all(conn)
        .await?;

    rows.iter()
        .map(|row| {
            Ok(OrderItemRow {
                product_id: ProductId::new(row.try_get("product_id")?),
                quantity: row.try_get("quantity")?,
            })
        })
        .collect()
}

/// Compare-and-swap an order's status.
///
/// The `status = expected` predicate keeps concurrent transitions one-way.
///
/// # Returns
///
/// `true` if the transition was applied.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn update_status(
    pool: &SqlitePool,
    id: &OrderId,
    expected: OrderStatus,
    next: OrderStatus,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query("UPDATE orders SET status = ? WHERE id = ? AND status = ?")
        .bind(next.to_string())
        .bind(id.as_str())
        .bind(expected.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete an order and its line rows together, inside an open transaction.
///
/// No soft delete: cancellation removes the order outright after stock
/// restoration.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a delete fails.
pub async fn delete_with_items(
    conn: &mut SqliteConnection,
    id: &OrderId,
) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM order_items WHERE order_id = ?")
        .bind(id.as_str())
        .execute(&mut *conn)
        .await?;

    sqlx::query("DELETE FROM orders WHERE id = ?")
        .bind(id.as_str())
        .execute(conn)
        .await?;

    Ok(())
}
