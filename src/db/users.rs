//! User database queries.
//!
//! Users are keyed by their VK id. Registration happens implicitly the
//! first time somebody writes to the bot.

use crate::models::{now, User, UserFilter, UserStats};
use crate::{Error, Result};
use sqlx::{QueryBuilder, Sqlite};
use tracing::{info, warn};

use super::DbPool;

// ============================================================================
// User Queries
// ============================================================================

/// Add a user, or refresh the name and gender of an existing one.
///
/// Registration date and block flag of an existing user are preserved.
pub async fn add_user(
    pool: &DbPool,
    vk_id: i64,
    first_name: &str,
    last_name: &str,
    gender: Option<i64>,
) -> Result<User> {
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (vk_id, first_name, last_name, gender, registration_date, is_blocked)
        VALUES (?, ?, ?, ?, ?, 0)
        ON CONFLICT(vk_id) DO UPDATE SET
            first_name = excluded.first_name,
            last_name = excluded.last_name,
            gender = excluded.gender
        RETURNING *
        "#,
    )
    .bind(vk_id)
    .bind(first_name)
    .bind(last_name)
    .bind(gender)
    .bind(now())
    .fetch_one(pool)
    .await?;

    info!(vk_id, name = %user.full_name(), "User added or updated");
    Ok(user)
}

/// Get a user by VK id.
pub async fn get_user_by_vk_id(pool: &DbPool, vk_id: i64) -> Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE vk_id = ?")
        .bind(vk_id)
        .fetch_optional(pool)
        .await
        .map_err(Error::Database)
}

/// Get a user by VK id, failing when absent.
pub async fn get_user(pool: &DbPool, vk_id: i64) -> Result<User> {
    get_user_by_vk_id(pool, vk_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("User {}", vk_id)))
}

async fn set_blocked(pool: &DbPool, vk_id: i64, blocked: bool) -> Result<bool> {
    let result = sqlx::query("UPDATE users SET is_blocked = ? WHERE vk_id = ?")
        .bind(blocked)
        .bind(vk_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Block a user. Returns false when the user is unknown.
pub async fn block_user(pool: &DbPool, vk_id: i64) -> Result<bool> {
    let found = set_blocked(pool, vk_id, true).await?;
    if found {
        info!(vk_id, "User blocked");
    } else {
        warn!(vk_id, "User to block not found");
    }
    Ok(found)
}

/// Unblock a user. Returns false when the user is unknown.
pub async fn unblock_user(pool: &DbPool, vk_id: i64) -> Result<bool> {
    let found = set_blocked(pool, vk_id, false).await?;
    if found {
        info!(vk_id, "User unblocked");
    } else {
        warn!(vk_id, "User to unblock not found");
    }
    Ok(found)
}

/// Whether a user is blocked. Unknown users are not blocked.
pub async fn is_user_blocked(pool: &DbPool, vk_id: i64) -> Result<bool> {
    let blocked: Option<(bool,)> = sqlx::query_as("SELECT is_blocked FROM users WHERE vk_id = ?")
        .bind(vk_id)
        .fetch_optional(pool)
        .await?;

    Ok(blocked.map(|(b,)| b).unwrap_or(false))
}

/// List users matching a filter, newest registrations first.
pub async fn list_users(pool: &DbPool, filter: &UserFilter) -> Result<Vec<User>> {
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM users WHERE 1=1");

    if let Some(gender) = filter.gender {
        query.push(" AND gender = ").push_bind(gender);
    }

    if let Some(blocked) = filter.is_blocked {
        query.push(" AND is_blocked = ").push_bind(blocked);
    }

    query.push(" ORDER BY registration_date DESC, id DESC");

    query
        .build_query_as::<User>()
        .fetch_all(pool)
        .await
        .map_err(Error::Database)
}

/// Aggregate user counters.
pub async fn user_stats(pool: &DbPool) -> Result<UserStats> {
    sqlx::query_as::<_, UserStats>(
        r#"
        SELECT
            COUNT(*) AS total,
            COALESCE(SUM(CASE WHEN is_blocked THEN 1 ELSE 0 END), 0) AS blocked,
            COALESCE(SUM(CASE WHEN gender = 2 THEN 1 ELSE 0 END), 0) AS male,
            COALESCE(SUM(CASE WHEN gender = 1 THEN 1 ELSE 0 END), 0) AS female
        FROM users
        "#,
    )
    .fetch_one(pool)
    .await
    .map_err(Error::Database)
}
