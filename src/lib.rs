//! voicebot - VK bot that answers text with synthesized voice messages
//!
//! Library exports for the binary and integration tests.

pub mod config;
pub mod controllers;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod telemetry;

pub use config::config;
pub use error::{Error, Result};
pub use state::AppState;
