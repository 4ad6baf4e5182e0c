//! Catalog route handlers.

use axum::Json;
use axum::extract::{Path, State};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};

use tamarind_core::ProductId;

use crate::db::products::{self, NewProduct, ProductUpdate};
use crate::db::RepositoryError;
use crate::error::AppError;
use crate::middleware::RequireOwner;
use crate::models::Product;
use crate::state::AppState;

/// Product create/update request body. Optional pricing and stock fields
/// default to zero so a minimal `{name, sku, price}` payload works.
#[derive(Debug, Deserialize)]
pub struct ProductPayload {
    pub id: Option<String>,
    pub name: String,
    pub sku: String,
    pub price: Decimal,
    #[serde(default)]
    pub price_dealer: Decimal,
    #[serde(default)]
    pub price_vip: Decimal,
    #[serde(default)]
    pub cost: Decimal,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub min_stock: i64,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub image: String,
}

fn validate(payload: &ProductPayload) -> Result<(), AppError> {
    if payload.name.trim().is_empty() || payload.sku.trim().is_empty() {
        return Err(AppError::BadRequest("name and sku are required".to_owned()));
    }
    if payload.price < Decimal::ZERO
        || payload.price_dealer < Decimal::ZERO
        || payload.price_vip < Decimal::ZERO
        || payload.cost < Decimal::ZERO
    {
        return Err(AppError::BadRequest("prices may not be negative".to_owned()));
    }
    if payload.stock < 0 || payload.min_stock < 0 {
        return Err(AppError::BadRequest("stock may not be negative".to_owned()));
    }
    Ok(())
}

/// List the catalog, name-ordered. Public: guests browse at retail.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Product>>, AppError> {
    let products = products::list(state.pool()).await?;
    Ok(Json(products))
}

/// Fetch one product.
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Product>, AppError> {
    let id = ProductId::from(id);
    products::get(state.pool(), &id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}

/// Create a product. Non-zero opening stock writes an "Initial Stock"
/// ledger entry in the same transaction.
pub async fn create(
    State(state): State<AppState>,
    RequireOwner(claims): RequireOwner,
    Json(payload): Json<ProductPayload>,
) -> Result<Json<Value>, AppError> {
    validate(&payload)?;

    let new = NewProduct {
        id: payload.id.map(ProductId::from),
        name: payload.name,
        sku: payload.sku,
        price: payload.price,
        price_dealer: payload.price_dealer,
        price_vip: payload.price_vip,
        cost: payload.cost,
        stock: payload.stock,
        min_stock: payload.min_stock,
        unit: payload.unit,
        category: payload.category,
        image: payload.image,
    };

    let product = match products::create(state.pool(), &new).await {
        Ok(product) => product,
        // Duplicate id or SKU is a client mistake, not a server fault
        Err(RepositoryError::Conflict(msg)) => return Err(AppError::BadRequest(msg)),
        Err(err) => return Err(err.into()),
    };

    tracing::info!(product_id = %product.id, by = %claims.username, "product created");

    Ok(Json(json!({ "success": true, "product": product })))
}

/// Full-replace update. Changing the id cascades to order lines and the
/// inventory ledger so history keeps pointing at the product.
pub async fn update(
    State(state): State<AppState>,
    RequireOwner(claims): RequireOwner,
    Path(id): Path<String>,
    Json(payload): Json<ProductPayload>,
) -> Result<Json<Value>, AppError> {
    validate(&payload)?;

    let current = ProductId::from(id);
    let update = ProductUpdate {
        id: payload.id.map_or_else(|| current.clone(), ProductId::from),
        name: payload.name,
        sku: payload.sku,
        price: payload.price,
        price_dealer: payload.price_dealer,
        price_vip: payload.price_vip,
        cost: payload.cost,
        stock: payload.stock,
        min_stock: payload.min_stock,
        unit: payload.unit,
        category: payload.category,
        image: payload.image,
    };

    let product = products::update(state.pool(), &current, &update).await?;

    tracing::info!(product_id = %product.id, by = %claims.username, "product updated");

    Ok(Json(json!({ "success": true, "product": product })))
}

/// Delete a product. Order history and ledger rows keep the id as a
/// dangling reference; cancellation handles that case explicitly.
pub async fn delete(
    State(state): State<AppState>,
    RequireOwner(claims): RequireOwner,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = ProductId::from(id);
    if !products::delete(state.pool(), &id).await? {
        return Err(AppError::NotFound(format!("product {id}")));
    }

    tracing::info!(product_id = %id, by = %claims.username, "product deleted");

    Ok(Json(json!({ "success": true })))
}
