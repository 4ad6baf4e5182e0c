//! Login route handler.

use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::AppError;
use crate::middleware::ClientIp;
use crate::services::{AuthService, RateDecision};
use crate::state::AppState;

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Authenticate and issue a session token.
///
/// Rate limited per source address; a successful login clears the counter
/// so a user who finally remembers their password is not locked out.
pub async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    if let RateDecision::Limited { retry_after_secs } = state.login_limiter().check(ip) {
        tracing::warn!(%ip, "login rate limit tripped");
        return Err(AppError::RateLimited { retry_after_secs });
    }

    let user = AuthService::new(state.pool())
        .login(&body.username, &body.password)
        .await?;

    state.login_limiter().reset(ip);

    let token = state.tokens().issue(&user);

    tracing::info!(user = %user.username, role = %user.role, "login");

    Ok(Json(json!({
        "success": true,
        "token": token,
        "user": {
            "id": user.id,
            "username": user.username,
            "name": user.name,
            "role": user.role,
        },
    })))
}
