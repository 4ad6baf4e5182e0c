//! Inventory ledger route handlers.

use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;
use serde_json::{Value, json};

use tamarind_core::ProductId;

use crate::db::{inventory, products};
use crate::error::AppError;
use crate::middleware::RequireAuth;
use crate::models::LedgerEntry;
use crate::state::AppState;

const DEFAULT_LEDGER_LIMIT: i64 = 100;
const MAX_LEDGER_LIMIT: i64 = 500;

#[derive(Debug, Deserialize)]
pub struct LedgerQuery {
    pub limit: Option<i64>,
}

/// Manual adjustment request body.
#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    pub product_id: String,
    /// Signed delta; positive receives stock, negative writes it off.
    pub delta: i64,
    #[serde(default)]
    pub reason: String,
}

/// List the ledger, newest first.
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(_claims): RequireAuth,
    Query(query): Query<LedgerQuery>,
) -> Result<Json<Vec<LedgerEntry>>, AppError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LEDGER_LIMIT)
        .clamp(1, MAX_LEDGER_LIMIT);
    let entries = inventory::list(state.pool(), limit).await?;
    Ok(Json(entries))
}

/// Apply a signed manual stock adjustment with an audit entry.
pub async fn adjust(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Json(body): Json<AdjustRequest>,
) -> Result<Json<Value>, AppError> {
    if body.delta == 0 {
        return Err(AppError::BadRequest("delta must be non-zero".to_owned()));
    }

    let id = ProductId::from(body.product_id);
    let reason = if body.reason.trim().is_empty() {
        "manual"
    } else {
        body.reason.trim()
    };

    let new_stock = products::adjust_stock(state.pool(), &id, body.delta, reason).await?;

    tracing::info!(
        product_id = %id,
        delta = body.delta,
        new_stock,
        by = %claims.username,
        "manual stock adjustment"
    );

    Ok(Json(json!({ "success": true, "stock": new_stock })))
}
