//! User repository.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use tamarind_core::{Role, UserId};

use super::{RepositoryError, map_unique_violation};
use crate::models::User;

/// Fields for creating a user.
#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    /// Already-hashed credential string.
    pub credential: String,
    pub name: String,
    pub role: Role,
}

/// Fields for updating a user. `None` leaves the column untouched.
#[derive(Debug, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub role: Option<Role>,
    /// Already-hashed credential string.
    pub credential: Option<String>,
}

fn user_from_row(row: &SqliteRow) -> Result<User, RepositoryError> {
    let role_raw: String = row.try_get("role")?;
    let role = Role::from_str(&role_raw)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid role in database: {e}")))?;

    Ok(User {
        id: UserId::new(row.try_get("id")?),
        username: row.try_get("username")?,
        name: row.try_get("name")?,
        role,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

/// List all users, without credentials.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list(pool: &SqlitePool) -> Result<Vec<User>, RepositoryError> {
    let rows = sqlx::query(
        "SELECT id, username, name, role, created_at, updated_at FROM users ORDER BY username",
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(user_from_row).collect()
}

/// Get a user by their ID.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get_by_id(pool: &SqlitePool, id: UserId) -> Result<Option<User>, RepositoryError> {
    let row = sqlx::query(
        "SELECT id, username, name, role, created_at, updated_at FROM users WHERE id = ?",
    )
    .bind(id.as_i64())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(user_from_row).transpose()
}

/// Get a user and their stored credential by username, for login.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get_with_credential(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<(User, String)>, RepositoryError> {
    let row = sqlx::query(
        "SELECT id, username, password, name, role, created_at, updated_at
         FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(ref r) => {
            let user = user_from_row(r)?;
            let credential: String = r.try_get("password")?;
            Ok(Some((user, credential)))
        }
        None => Ok(None),
    }
}

/// Create a new user.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the username already exists.
pub async fn create(pool: &SqlitePool, new_user: &NewUser) -> Result<User, RepositoryError> {
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO users (username, password, name, role, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&new_user.username)
    .bind(&new_user.credential)
    .bind(&new_user.name)
    .bind(new_user.role.to_string())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| map_unique_violation(e, "username already exists"))?;

    let id = UserId::new(result.last_insert_rowid());
    get_by_id(pool, id)
        .await?
        .ok_or_else(|| RepositoryError::NotFound(format!("user {id} vanished after insert")))
}

/// Update a user's name, role or credential.
///
/// Refuses to change the last remaining owner to a lesser role, for the
/// same reason `delete` refuses to remove them.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the user does not exist, or
/// `RepositoryError::Conflict` if the change would demote the last owner.
pub async fn update(
    pool: &SqlitePool,
    id: UserId,
    update: &UserUpdate,
) -> Result<User, RepositoryError> {
    let mut tx = pool.begin().await?;

    if let Some(new_role) = update.role
        && new_role != Role::Owner
    {
        let current: Option<String> = sqlx::query_scalar("SELECT role FROM users WHERE id = ?")
            .bind(id.as_i64())
            .fetch_optional(&mut *tx)
            .await?;
        if current == Some(Role::Owner.to_string()) {
            let owners: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = ?")
                .bind(Role::Owner.to_string())
                .fetch_one(&mut *tx)
                .await?;
            if owners <= 1 {
                return Err(RepositoryError::Conflict(
                    "cannot demote the last owner".to_owned(),
                ));
            }
        }
    }

    let result = sqlx::query(
        "UPDATE users SET
            name = COALESCE(?, name),
            role = COALESCE(?, role),
            password = COALESCE(?, password),
            updated_at = ?
         WHERE id = ?",
    )
    .bind(update.name.as_deref())
    .bind(update.role.map(|r| r.to_string()))
    .bind(update.credential.as_deref())
    .bind(Utc::now())
    .bind(id.as_i64())
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound(format!("user {id}")));
    }

    tx.commit().await?;

    get_by_id(pool, id)
        .await?
        .ok_or_else(|| RepositoryError::NotFound(format!("user {id}")))
}

/// Replace a user's stored credential.
///
/// Used by the legacy plain-text upgrade path on successful login.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn update_credential(
    pool: &SqlitePool,
    id: UserId,
    credential: &str,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE users SET password = ?, updated_at = ? WHERE id = ?")
        .bind(credential)
        .bind(Utc::now())
        .bind(id.as_i64())
        .execute(pool)
        .await?;

    Ok(())
}

/// Delete a user.
///
/// Refuses to delete the last remaining owner, since that would lock
/// everyone out of store administration permanently.
///
/// # Returns
///
/// `true` if the user was deleted, `false` if it didn't exist.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the target is the last owner.
pub async fn delete(pool: &SqlitePool, id: UserId) -> Result<bool, RepositoryError> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query("SELECT role FROM users WHERE id = ?")
        .bind(id.as_i64())
        .fetch_optional(&mut *tx)
        .await?;

    let Some(row) = row else {
        return Ok(false);
    };

    let role: String = row.try_get("role")?;
    if role == Role::Owner.to_string() {
        let owners: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = ?")
            .bind(Role::Owner.to_string())
            .fetch_one(&mut *tx)
            .await?;
        if owners <= 1 {
            return Err(RepositoryError::Conflict(
                "cannot delete the last owner".to_owned(),
            ));
        }
    }

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id.as_i64())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_in_memory_pool;

    async fn seed_user(pool: &SqlitePool, username: &str, role: Role) -> User {
        create(
            pool,
            &NewUser {
                username: username.to_owned(),
                credential: "pbkdf2:50000:salt:hash".to_owned(),
                name: username.to_owned(),
                role,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn create_and_fetch_round_trip() {
        let pool = create_in_memory_pool().await.unwrap();
        let user = seed_user(&pool, "malee", Role::Staff).await;

        let fetched = get_by_id(&pool, user.id).await.unwrap().unwrap();
        assert_eq!(fetched.username, "malee");
        assert_eq!(fetched.role, Role::Staff);
    }

    #[tokio::test]
    async fn duplicate_username_is_a_conflict() {
        let pool = create_in_memory_pool().await.unwrap();
        seed_user(&pool, "malee", Role::Staff).await;

        let err = create(
            &pool,
            &NewUser {
                username: "malee".to_owned(),
                credential: "x".to_owned(),
                name: String::new(),
                role: Role::Staff,
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn last_owner_cannot_be_demoted() {
        let pool = create_in_memory_pool().await.unwrap();
        let owner = seed_user(&pool, "boss", Role::Owner).await;

        let demotion = UserUpdate {
            role: Some(Role::Staff),
            ..UserUpdate::default()
        };
        let err = update(&pool, owner.id, &demotion).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        let unchanged = get_by_id(&pool, owner.id).await.unwrap().unwrap();
        assert_eq!(unchanged.role, Role::Owner);

        // Name edits and equal-role updates stay fine on the sole owner
        let rename = UserUpdate {
            name: Some("The Boss".to_owned()),
            role: Some(Role::Owner),
            ..UserUpdate::default()
        };
        let renamed = update(&pool, owner.id, &rename).await.unwrap();
        assert_eq!(renamed.name, "The Boss");

        // A second owner unblocks the demotion
        seed_user(&pool, "boss2", Role::Owner).await;
        let demoted = update(&pool, owner.id, &demotion).await.unwrap();
        assert_eq!(demoted.role, Role::Staff);
    }

    #[tokio::test]
    async fn last_owner_cannot_be_deleted() {
        let pool = create_in_memory_pool().await.unwrap();
        let owner = seed_user(&pool, "boss", Role::Owner).await;
        let staff = seed_user(&pool, "malee", Role::Staff).await;

        let err = delete(&pool, owner.id).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        // A non-owner deletes fine, and a second owner unblocks the first
        assert!(delete(&pool, staff.id).await.unwrap());
        let second = seed_user(&pool, "boss2", Role::Owner).await;
        assert!(delete(&pool, owner.id).await.unwrap());
        assert!(get_by_id(&pool, second.id).await.unwrap().is_some());
    }
}
