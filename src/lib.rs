//! # chat-relay
//!
//! A real-time group chat relay over WebSockets.
//!
//! Authenticated clients join a single room. Every message a client sends is
//! stamped with the sender's identity, avatar and receipt time, then fanned
//! out to every member in one global order.
//!
//! # Quick start
//!
//! ```no_run
//! use chat_relay::identity::{SessionAuthenticator, SessionStore};
//! use chat_relay::server::{ChatServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> chat_relay::Result<()> {
//!     let config = ServerConfig::from_env()?;
//!     let store = SessionStore::new();
//!     let auth = SessionAuthenticator::new(store, config.session_cookie.clone());
//!
//!     ChatServer::new(config, auth).run().await
//! }
//! ```
//!
//! # Modules
//!
//! - [`room`]: the broadcast hub and its event loop
//! - [`session`]: per-connection inbound and outbound pumps
//! - [`server`]: HTTP routing, the auth gate and the listener
//! - [`identity`]: session data, identities and avatar URLs
//! - [`trace`]: pluggable room activity tracing
//! - [`stats`]: room and connection counters

pub mod error;
pub mod identity;
pub mod room;
pub mod server;
pub mod session;
pub mod stats;
pub mod trace;

pub use error::{Error, Result};
pub use identity::{Avatar, Identity};
pub use room::{ChatMessage, Room, RoomConfig};
pub use server::{ChatServer, ServerConfig};
pub use trace::Tracer;
