//! Message routing controllers.
//!
//! Provides handlers for:
//! - Administrator commands
//! - Regular messages turned into voice replies

mod admin;
mod message;
pub mod replies;

pub use admin::*;
pub use message::*;
