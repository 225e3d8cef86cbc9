//! Data models for the voice bot.
//!
//! Defines the users and administrators stored in SQLite, the incoming
//! message type handled by the controllers, and long poll updates.

mod admin;
mod message;
mod update;
mod user;

pub use admin::*;
pub use message::*;
pub use update::*;
pub use user::*;

use chrono::{DateTime, Utc};

/// Current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}
