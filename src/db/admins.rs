//! Administrator database queries.

use crate::models::{now, Admin};
use crate::{Error, Result};
use tracing::info;

use super::DbPool;

/// Add an administrator. Adding an existing one is a no-op.
pub async fn add_admin(pool: &DbPool, vk_id: i64) -> Result<Admin> {
    sqlx::query("INSERT INTO admins (vk_id, created_at) VALUES (?, ?) ON CONFLICT(vk_id) DO NOTHING")
        .bind(vk_id)
        .bind(now())
        .execute(pool)
        .await?;

    let admin = get_admin_by_vk_id(pool, vk_id)
        .await?
        .ok_or_else(|| Error::Internal(format!("Failed to create admin {}", vk_id)))?;

    info!(vk_id, "Administrator added");
    Ok(admin)
}

/// Get an administrator by VK id.
pub async fn get_admin_by_vk_id(pool: &DbPool, vk_id: i64) -> Result<Option<Admin>> {
    sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE vk_id = ?")
        .bind(vk_id)
        .fetch_optional(pool)
        .await
        .map_err(Error::Database)
}

pub async fn is_admin(pool: &DbPool, vk_id: i64) -> Result<bool> {
    Ok(get_admin_by_vk_id(pool, vk_id).await?.is_some())
}

/// List all administrators, most recently added first.
pub async fn list_admins(pool: &DbPool) -> Result<Vec<Admin>> {
    sqlx::query_as::<_, Admin>("SELECT * FROM admins ORDER BY created_at DESC, id DESC")
        .fetch_all(pool)
        .await
        .map_err(Error::Database)
}

pub async fn count_admins(pool: &DbPool) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM admins")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Seed the bootstrap administrator if configured and not yet present.
///
/// Returns true when a new administrator was created.
pub async fn ensure_first_admin(pool: &DbPool, vk_id: Option<i64>) -> Result<bool> {
    let Some(vk_id) = vk_id else {
        return Ok(false);
    };

    if is_admin(pool, vk_id).await? {
        return Ok(false);
    }

    add_admin(pool, vk_id).await?;
    info!(vk_id, "First administrator created");
    Ok(true)
}
