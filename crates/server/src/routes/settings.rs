//! Store settings route handlers.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use tamarind_core::Role;

use crate::db::settings;
use crate::error::AppError;
use crate::middleware::{OptionalAuth, RequireOwner};
use crate::state::AppState;

/// Fetch settings. Guests and staff see the public subset (store name,
/// currency, discount rate, receipt text); the owner sees everything.
pub async fn get(
    State(state): State<AppState>,
    OptionalAuth(claims): OptionalAuth,
) -> Result<Json<BTreeMap<String, String>>, AppError> {
    let is_owner = claims.is_some_and(|c| c.role == Role::Owner);
    let entries = if is_owner {
        settings::get_all(state.pool()).await?
    } else {
        settings::get_public(state.pool()).await?
    };
    Ok(Json(entries))
}

/// Upsert settings key/values.
pub async fn set(
    State(state): State<AppState>,
    RequireOwner(claims): RequireOwner,
    Json(entries): Json<BTreeMap<String, String>>,
) -> Result<Json<Value>, AppError> {
    if entries.is_empty() {
        return Err(AppError::BadRequest("no settings provided".to_owned()));
    }

    settings::set_many(state.pool(), &entries).await?;

    tracing::info!(keys = entries.len(), by = %claims.username, "settings updated");

    Ok(Json(json!({ "success": true })))
}
