//! WebSocket front door
//!
//! Routes `GET /room` through the auth gate and upgrades it into a room
//! connection. Everything past the upgrade lives in [`crate::session`].

pub mod auth;
pub mod config;
pub mod handler;
pub mod listener;

pub use config::{ConfigError, ServerConfig};
pub use listener::{AppState, ChatServer};
