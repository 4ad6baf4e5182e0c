//! Authentication service.
//!
//! Password login with transparent legacy-credential upgrade.

use sqlx::SqlitePool;

use crate::db::{RepositoryError, users};
use crate::models::User;
use crate::services::password;

/// Authentication failure.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Wrong username or password. Deliberately one variant for both, so
    /// responses don't leak which usernames exist.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Authentication service.
pub struct AuthService<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Login with username and password.
    ///
    /// On a successful match against a legacy plain-text credential, the
    /// stored value is re-hashed and persisted before returning, so the
    /// plain text survives at most one successful login.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the username/password is
    /// wrong.
    pub async fn login(&self, username: &str, password_input: &str) -> Result<User, AuthError> {
        let (user, credential) = users::get_with_credential(self.pool, username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !password::verify_password(password_input, &credential) {
            return Err(AuthError::InvalidCredentials);
        }

        if password::is_legacy_credential(&credential) {
            let upgraded = password::hash_password(password_input);
            users::update_credential(self.pool, user.id, &upgraded).await?;
            tracing::info!(user = %user.username, "upgraded legacy plain-text credential");
        }

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_in_memory_pool;
    use crate::db::users::NewUser;
    use tamarind_core::Role;

    async fn seed(pool: &SqlitePool, username: &str, credential: &str) -> User {
        users::create(
            pool,
            &NewUser {
                username: username.to_owned(),
                credential: credential.to_owned(),
                name: username.to_owned(),
                role: Role::Staff,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn login_with_hashed_credential() {
        let pool = create_in_memory_pool().await.unwrap();
        seed(&pool, "malee", &password::hash_password("s3cret-passw0rd")).await;

        let auth = AuthService::new(&pool);
        let user = auth.login("malee", "s3cret-passw0rd").await.unwrap();
        assert_eq!(user.username, "malee");

        let err = auth.login("malee", "wrong").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        let err = auth.login("nobody", "s3cret-passw0rd").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn legacy_credential_is_upgraded_on_login() {
        let pool = create_in_memory_pool().await.unwrap();
        let user = seed(&pool, "malee", "plain-old-password").await;

        let auth = AuthService::new(&pool);
        auth.login("malee", "plain-old-password").await.unwrap();

        let (_, stored) = users::get_with_credential(&pool, "malee")
            .await
            .unwrap()
            .unwrap();
        assert!(stored.starts_with("pbkdf2:"));
        assert!(!password::is_legacy_credential(&stored));

        // And the upgraded credential still works
        let again = auth.login("malee", "plain-old-password").await.unwrap();
        assert_eq!(again.id, user.id);
    }
}
