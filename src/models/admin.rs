//! Bot administrator model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An administrator allowed to run management commands.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Admin {
    pub id: i64,
    pub vk_id: i64,
    pub created_at: DateTime<Utc>,
}
