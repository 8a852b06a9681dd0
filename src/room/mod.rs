//! Room broadcast hub
//!
//! The room owns the membership registry and fans every forwarded message out
//! to all current members. A single event loop task serializes all access to
//! the registry, so no locks guard it.
//!
//! # Architecture
//!
//! ```text
//!      [Connection]         [Connection]          [Connection]
//!      inbound pump         inbound pump          inbound pump
//!           │                    │                     │
//!           └── join / leave / forward (three mpsc queues) ──┐
//!                                                            ▼
//!                                   ┌─────────────────────────────────┐
//!                                   │ RoomLoop (one task)             │
//!                                   │   members: HashMap<Id, Member>  │
//!                                   │   select! over the three queues │
//!                                   └───────────────┬─────────────────┘
//!                                                   │ push (blocking)
//!           ┌────────────────────┬──────────────────┘
//!           ▼                    ▼
//!      outbound queue       outbound queue      (bounded, one per member)
//!      outbound pump        outbound pump ──► WebSocket
//! ```
//!
//! # Ownership of outbound queues
//!
//! The room holds the only sender of each member's outbound queue. Removing a
//! member (on leave, or on eviction in [`FanoutMode::Evict`]) drops that
//! sender and closes the queue exactly once, after the member is already out
//! of the registry. A connection never closes its own queue.

pub mod config;
pub mod error;
pub mod hub;
pub mod member;
pub mod message;

pub use config::{FanoutMode, RoomConfig};
pub use error::RoomError;
pub use hub::Room;
pub use member::{Member, OutboundReceiver};
pub use message::{ChatMessage, ConnectionId, InboundFrame};
