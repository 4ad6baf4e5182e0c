//! Product repository.
//!
//! Stock mutations here are conditional writes: the `stock >= ?` predicate on
//! the decrement re-validates availability at the write barrier, so two
//! checkouts racing on the same product cannot drive stock negative even
//! though both passed the earlier read-side validation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqliteExecutor, SqlitePool};

use tamarind_core::ProductId;

use super::{RepositoryError, inventory, map_unique_violation, parse_money};
use crate::models::Product;
use crate::models::inventory::actions;

/// Fields for creating a product.
#[derive(Debug)]
pub struct NewProduct {
    /// External id; generated when the client does not supply one.
    pub id: Option<ProductId>,
    pub name: String,
    pub sku: String,
    pub price: Decimal,
    pub price_dealer: Decimal,
    pub price_vip: Decimal,
    pub cost: Decimal,
    pub stock: i64,
    pub min_stock: i64,
    pub unit: String,
    pub category: String,
    pub image: String,
}

/// Full-row replacement for a product update.
///
/// `id` may differ from the addressed product, renaming it; the rename
/// cascades to order lines and the inventory ledger so history stays joined.
#[derive(Debug)]
pub struct ProductUpdate {
    pub id: ProductId,
    pub name: String,
    pub sku: String,
    pub price: Decimal,
    pub price_dealer: Decimal,
    pub price_vip: Decimal,
    pub cost: Decimal,
    pub stock: i64,
    pub min_stock: i64,
    pub unit: String,
    pub category: String,
    pub image: String,
}

fn product_from_row(row: &SqliteRow) -> Result<Product, RepositoryError> {
    Ok(Product {
        id: ProductId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        sku: row.try_get("sku")?,
        price: parse_money("price", &row.try_get::<String, _>("price")?)?,
        price_dealer: parse_money("price_dealer", &row.try_get::<String, _>("price_dealer")?)?,
        price_vip: parse_money("price_vip", &row.try_get::<String, _>("price_vip")?)?,
        cost: parse_money("cost", &row.try_get::<String, _>("cost")?)?,
        stock: row.try_get("stock")?,
        min_stock: row.try_get("min_stock")?,
        unit: row.try_get("unit")?,
        category: row.try_get("category")?,
        image: row.try_get("image")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

const PRODUCT_COLUMNS: &str = "id, name, sku, price, price_dealer, price_vip, cost, \
     stock, min_stock, unit, category, image, created_at, updated_at";

/// List the whole catalog, name-ordered.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list(pool: &SqlitePool) -> Result<Vec<Product>, RepositoryError> {
    let rows = sqlx::query(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name"
    ))
    .fetch_all(pool)
    .await?;

    rows.iter().map(product_from_row).collect()
}

/// Get a product by id.
///
/// Takes any executor so the checkout orchestrator can read inside its
/// transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get<'e>(
    exec: impl SqliteExecutor<'e>,
    id: &ProductId,
) -> Result<Option<Product>, RepositoryError> {
    let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?"))
        .bind(id.as_str())
        .fetch_optional(exec)
        .await?;

    row.as_ref().map(product_from_row).transpose()
}

/// Create a product, writing an "Initial Stock" ledger entry when it
/// arrives with stock on hand.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` on a duplicate id or SKU.
pub async fn create(pool: &SqlitePool, new: &NewProduct) -> Result<Product, RepositoryError> {
    let id = new.id.clone().unwrap_or_else(ProductId::generate);
    let now = Utc::now();

    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO products
            (id, name, sku, price, price_dealer, price_vip, cost,
             stock, min_stock, unit, category, image, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id.as_str())
    .bind(&new.name)
    .bind(&new.sku)
    .bind(new.price.to_string())
    .bind(new.price_dealer.to_string())
    .bind(new.price_vip.to_string())
    .bind(new.cost.to_string())
    .bind(new.stock)
    .bind(new.min_stock)
    .bind(&new.unit)
    .bind(&new.category)
    .bind(&new.image)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .map_err(|e| map_unique_violation(e, "product id or SKU already exists"))?;

    if new.stock > 0 {
        inventory::append(
            &mut *tx,
            &inventory::NewLedgerEntry {
                action: actions::INITIAL_STOCK,
                product_id: &id,
                product_name: &new.name,
                quantity_change: new.stock,
                new_stock: new.stock,
                reference: "manual_add",
            },
        )
        .await?;
    }

    tx.commit().await?;

    get(pool, &id)
        .await?
        .ok_or_else(|| RepositoryError::NotFound(format!("product {id} vanished after insert")))
}

/// Update a product, cascading an id rename to order lines and the ledger.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the product does not exist and
/// `RepositoryError::Conflict` if the new id or SKU is taken.
pub async fn update(
    pool: &SqlitePool,
    id: &ProductId,
    update: &ProductUpdate,
) -> Result<Product, RepositoryError> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "UPDATE products SET
            id = ?, name = ?, sku = ?, price = ?, price_dealer = ?, price_vip = ?,
            cost = ?, stock = ?, min_stock = ?, unit = ?, category = ?, image = ?,
            updated_at = ?
         WHERE id = ?",
    )
    .bind(update.id.as_str())
    .bind(&update.name)
    .bind(&update.sku)
    .bind(update.price.to_string())
    .bind(update.price_dealer.to_string())
    .bind(update.price_vip.to_string())
    .bind(update.cost.to_string())
    .bind(update.stock)
    .bind(update.min_stock)
    .bind(&update.unit)
    .bind(&update.category)
    .bind(&update.image)
    .bind(Utc::now())
    .bind(id.as_str())
    .execute(&mut *tx)
    .await
    .map_err(|e| map_unique_violation(e, "product id or SKU already exists"))?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound(format!("product {id}")));
    }

    if update.id != *id {
        sqlx::query("UPDATE order_items SET product_id = ? WHERE product_id = ?")
            .bind(update.id.as_str())
            .bind(id.as_str())
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE inventory_log SET product_id = ? WHERE product_id = ?")
            .bind(update.id.as_str())
            .bind(id.as_str())
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    get(pool, &update.id)
        .await?
        .ok_or_else(|| RepositoryError::NotFound(format!("product {} vanished after update", update.id)))
}

/// Delete a product.
///
/// # Returns
///
/// `true` if the product was deleted, `false` if it didn't exist.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn delete(pool: &SqlitePool, id: &ProductId) -> Result<bool, RepositoryError> {
    let result = sqlx::query("DELETE FROM products WHERE id = ?")
        .bind(id.as_str())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Conditionally decrement stock inside a checkout transaction.
///
/// The `stock >= quantity` predicate makes this a compare-and-swap: if a
/// concurrent commit consumed the stock after our validation read, zero rows
/// match and the caller aborts the whole transaction.
///
/// # Returns
///
/// The new stock balance, or `None` if the predicate did not hold.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
pub async fn try_decrement_stock(
    conn: &mut SqliteConnection,
    id: &ProductId,
    quantity: i64,
) -> Result<Option<i64>, RepositoryError> {
    let result = sqlx::query(
        "UPDATE products SET stock = stock - ?, updated_at = ?
         WHERE id = ? AND stock >= ?",
    )
    .bind(quantity)
    .bind(Utc::now())
    .bind(id.as_str())
    .bind(quantity)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    let stock: i64 = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?")
        .bind(id.as_str())
        .fetch_one(conn)
        .await?;

    Ok(Some(stock))
}

/// Restore stock inside a cancellation transaction.
///
/// # Returns
///
/// The new stock balance, or `None` if the product no longer exists.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
pub async fn restore_stock(
    conn: &mut SqliteConnection,
    id: &ProductId,
    quantity: i64,
) -> Result<Option<i64>, RepositoryError> {
    let result = sqlx::query(
        "UPDATE products SET stock = stock + ?, updated_at = ? WHERE id = ?",
    )
    .bind(quantity)
    .bind(Utc::now())
    .bind(id.as_str())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    let stock: i64 = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?")
        .bind(id.as_str())
        .fetch_one(conn)
        .await?;

    Ok(Some(stock))
}

/// Apply a manual signed stock adjustment with an audit entry.
///
/// The conditional write refuses any delta that would take stock below zero.
///
/// # Returns
///
/// The new stock balance.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` for an unknown product and
/// `RepositoryError::Conflict` if the delta would drive stock negative.
pub async fn adjust_stock(
    pool: &SqlitePool,
    id: &ProductId,
    delta: i64,
    reason: &str,
) -> Result<i64, RepositoryError> {
    let mut tx = pool.begin().await?;

    let product = get(&mut *tx, id)
        .await?
        .ok_or_else(|| RepositoryError::NotFound(format!("product {id}")))?;

    let result = sqlx::query(
        "UPDATE products SET stock = stock + ?, updated_at = ?
         WHERE id = ? AND stock + ? >= 0",
    )
    .bind(delta)
    .bind(Utc::now())
    .bind(id.as_str())
    .bind(delta)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::Conflict(format!(
            "adjustment of {delta} would drive stock of {id} negative"
        )));
    }

    let new_stock: i64 = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?")
        .bind(id.as_str())
        .fetch_one(&mut *tx)
        .await?;

    inventory::append(
        &mut *tx,
        &inventory::NewLedgerEntry {
            action: actions::ADJUSTMENT,
            product_id: id,
            product_name: &product.name,
            quantity_change: delta,
            new_stock,
            reference: reason,
        },
    )
    .await?;

    tx.commit().await?;

    Ok(new_stock)
}
