//! Client connections
//!
//! A connection is one upgraded WebSocket joined to the room, driven by an
//! inbound and an outbound pump.

pub mod connection;
pub mod context;

pub use connection::{outbound_pump, Connection};
pub use context::ConnectionContext;
