//! Account management route handlers. Owner only.

use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use serde_json::{Value, json};

use tamarind_core::{Role, UserId};

use crate::db::users::{self, NewUser, UserUpdate};
use crate::error::AppError;
use crate::middleware::RequireOwner;
use crate::models::User;
use crate::services::password;
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 4;

/// Account creation request body.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub name: String,
    pub role: Role,
}

/// Account update request body. Absent fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub role: Option<Role>,
    pub password: Option<String>,
}

/// List accounts. Credentials never leave the store layer.
pub async fn list(
    State(state): State<AppState>,
    RequireOwner(_claims): RequireOwner,
) -> Result<Json<Vec<User>>, AppError> {
    let users = users::list(state.pool()).await?;
    Ok(Json(users))
}

/// Create an account with a hashed credential.
pub async fn create(
    State(state): State<AppState>,
    RequireOwner(claims): RequireOwner,
    Json(body): Json<CreateUserRequest>,
) -> Result<Json<Value>, AppError> {
    let username = body.username.trim();
    if username.is_empty() {
        return Err(AppError::BadRequest("username is required".to_owned()));
    }
    if body.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let user = users::create(
        state.pool(),
        &NewUser {
            username: username.to_owned(),
            credential: password::hash_password(&body.password),
            name: body.name,
            role: body.role,
        },
    )
    .await?;

    tracing::info!(user = %user.username, role = %user.role, by = %claims.username, "user created");

    Ok(Json(json!({ "success": true, "user": user })))
}

/// Update an account; a supplied password is re-hashed.
pub async fn update(
    State(state): State<AppState>,
    RequireOwner(claims): RequireOwner,
    Path(id): Path<i64>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<Value>, AppError> {
    if let Some(password) = &body.password
        && password.len() < MIN_PASSWORD_LEN
    {
        return Err(AppError::BadRequest(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let update = UserUpdate {
        name: body.name,
        role: body.role,
        credential: body.password.as_deref().map(password::hash_password),
    };

    let user = users::update(state.pool(), UserId::new(id), &update).await?;

    tracing::info!(user = %user.username, by = %claims.username, "user updated");

    Ok(Json(json!({ "success": true, "user": user })))
}

/// Delete an account. The store refuses to remove the last owner, so the
/// system can never lock itself out.
pub async fn delete(
    State(state): State<AppState>,
    RequireOwner(claims): RequireOwner,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    if !users::delete(state.pool(), UserId::new(id)).await? {
        return Err(AppError::NotFound(format!("user {id}")));
    }

    tracing::info!(user_id = id, by = %claims.username, "user deleted");

    Ok(Json(json!({ "success": true })))
}
