//! Database operations for the `users` table.
//!
//! Sign-up and credential checks live outside this service; rows are created
//! by the CLI and by tests.

use chrono::{DateTime, Utc};
use runmate_core::{User, UserPatch};
use sqlx::PgPool;
use uuid::Uuid;

use crate::products::escape_like;
use crate::reviews::{lock_product, recompute_rating};
use crate::{DbError, Page};

const USER_COLUMNS: &str = "id, email, name, photo, is_admin, is_social, created_at";

/// A row from the `users` table. The password hash is never selected.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub photo: String,
    pub is_admin: bool,
    pub is_social: bool,
    pub created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            name: row.name,
            photo: row.photo,
            is_admin: row.is_admin,
            is_social: row.is_social,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub name: &'a str,
    pub password_hash: Option<&'a str>,
    pub is_social: bool,
    pub is_admin: bool,
}

/// Inserts a user. Emails are stored lowercased.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on failure, including a unique violation when
/// the email is already registered.
pub async fn insert_user(pool: &PgPool, user: &NewUser<'_>) -> Result<UserRow, DbError> {
    let row = sqlx::query_as::<_, UserRow>(
        "INSERT INTO users (id, email, name, password_hash, is_social, is_admin) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING id, email, name, photo, is_admin, is_social, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(user.email.trim().to_lowercase())
    .bind(user.name)
    .bind(user.password_hash)
    .bind(user.is_social)
    .bind(user.is_admin)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_user(pool: &PgPool, id: Uuid) -> Result<Option<UserRow>, DbError> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, email, name, photo, is_admin, is_social, created_at \
         FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Looks a user up by email, case-insensitively.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_user_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRow>, DbError> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, email, name, photo, is_admin, is_social, created_at \
         FROM users WHERE email = $1",
    )
    .bind(email.trim().to_lowercase())
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UserFilters<'a> {
    /// Case-insensitive substring match over name and email.
    pub search: Option<&'a str>,
    pub limit: i64,
    pub offset: i64,
}

/// Lists users matching `filters`, newest first, with the total number of
/// matches ignoring pagination.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either query fails.
pub async fn list_users(
    pool: &PgPool,
    filters: &UserFilters<'_>,
) -> Result<Page<UserRow>, DbError> {
    const WHERE_CLAUSE: &str =
        "WHERE ($1::TEXT IS NULL OR name ILIKE '%' || $1 || '%' OR email ILIKE '%' || $1 || '%')";

    let search = filters
        .search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(escape_like);

    let total: i64 =
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM users {WHERE_CLAUSE}"))
            .bind(search.as_deref())
            .fetch_one(pool)
            .await?;

    let items = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users {WHERE_CLAUSE} \
         ORDER BY created_at DESC, email \
         LIMIT $2 OFFSET $3"
    ))
    .bind(search.as_deref())
    .bind(filters.limit)
    .bind(filters.offset)
    .fetch_all(pool)
    .await?;

    Ok(Page { items, total })
}

/// Sets or clears the admin flag. Returns `None` if the user does not exist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn set_user_admin(
    pool: &PgPool,
    id: Uuid,
    is_admin: bool,
) -> Result<Option<UserRow>, DbError> {
    let row = sqlx::query_as::<_, UserRow>(
        "UPDATE users SET is_admin = $2 WHERE id = $1 \
         RETURNING id, email, name, photo, is_admin, is_social, created_at",
    )
    .bind(id)
    .bind(is_admin)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Applies a sparse update. The patch is expected to have passed
/// [`UserPatch::normalize`]. Returns `None` if the user does not exist.
///
/// # Errors
///
/// Returns [`DbError::EmailTaken`] if the new email belongs to another
/// account, or [`DbError::Sqlx`] if the update fails.
pub async fn update_user(
    pool: &PgPool,
    id: Uuid,
    patch: &UserPatch,
) -> Result<Option<UserRow>, DbError> {
    let result = sqlx::query_as::<_, UserRow>(&format!(
        "UPDATE users SET \
             name = COALESCE($2, name), \
             email = COALESCE($3, email), \
             is_admin = COALESCE($4, is_admin) \
         WHERE id = $1 \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(id)
    .bind(patch.name.as_deref())
    .bind(patch.email.as_deref())
    .bind(patch.is_admin)
    .fetch_optional(pool)
    .await
    .map_err(DbError::from);

    match result {
        Err(err) if err.is_unique_violation() => Err(DbError::EmailTaken {
            email: patch.email.clone().unwrap_or_default(),
        }),
        other => other,
    }
}

/// Deletes a user together with their orders and reviews, then recomputes
/// the rating of every product they had reviewed. Returns `None` if the user
/// does not exist.
///
/// # Errors
///
/// Returns [`DbError::UserNotDeletable`] if the user still owns catalog
/// products or has orders in fulfilment, or [`DbError::Sqlx`] on failure.
pub async fn delete_user(pool: &PgPool, id: Uuid) -> Result<Option<UserRow>, DbError> {
    let mut tx = pool.begin().await?;

    let Some(user) = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    else {
        return Ok(None);
    };

    let owned: i64 =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products WHERE created_by = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
    if owned > 0 {
        return Err(DbError::UserNotDeletable {
            id,
            reason: format!("owns {owned} catalog product(s)"),
        });
    }

    let open: i64 = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM orders \
         WHERE user_id = $1 AND status IN ('pending', 'processing', 'shipped')",
    )
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;
    if open > 0 {
        return Err(DbError::UserNotDeletable {
            id,
            reason: format!("has {open} open order(s)"),
        });
    }

    let reviewed: Vec<Uuid> = sqlx::query_scalar::<_, Uuid>(
        "SELECT DISTINCT product_id FROM reviews WHERE user_id = $1 ORDER BY product_id",
    )
    .bind(id)
    .fetch_all(&mut *tx)
    .await?;
    for product_id in &reviewed {
        lock_product(&mut tx, *product_id).await?;
    }

    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    for product_id in reviewed {
        recompute_rating(&mut tx, product_id).await?;
    }

    tx.commit().await?;
    Ok(Some(user))
}
