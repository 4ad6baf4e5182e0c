//! User model.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tamarind_core::{Role, UserId};

/// A store user account.
///
/// The password credential is intentionally not part of this struct; it only
/// travels through `db::users::get_with_credential` during login.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
