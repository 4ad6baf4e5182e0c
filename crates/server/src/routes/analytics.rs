//! Dashboard analytics route handler.

use axum::Json;
use axum::extract::State;

use crate::db::analytics;
use crate::error::AppError;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Dashboard summary: counts, today's sales, low-stock count, a 7-day
/// daily sales series and the best sellers.
pub async fn summary(
    State(state): State<AppState>,
    RequireAuth(_claims): RequireAuth,
) -> Result<Json<analytics::Summary>, AppError> {
    let summary = analytics::summary(state.pool()).await?;
    Ok(Json(summary))
}
