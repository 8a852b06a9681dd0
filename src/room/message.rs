//! Chat message and connection identifier types
//!
//! This module defines the key type that identifies a member of the room and
//! the messages that are fanned out to members.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::Identity;

/// Unique identifier for a connection in the room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A message to be broadcast to every member
///
/// Immutable once built. The room shares it between members as
/// `Arc<ChatMessage>`, so fan-out never copies the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Sender's user id
    #[serde(rename = "UserID")]
    pub user_id: String,
    /// Sender's display name
    #[serde(rename = "FullName")]
    pub full_name: String,
    /// Sender's avatar URL (empty if none could be resolved)
    #[serde(rename = "AvatarURL")]
    pub avatar_url: String,
    /// Message body
    #[serde(rename = "Message")]
    pub message: String,
    /// When the server decoded the frame
    #[serde(rename = "When")]
    pub when: DateTime<Utc>,
}

impl ChatMessage {
    /// Build a message from a sender identity, stamped with the current time
    pub fn from_sender(identity: &Identity, avatar_url: String, body: String) -> Self {
        Self::from_sender_at(identity, avatar_url, body, Utc::now())
    }

    /// Build a message with an explicit receipt time
    pub fn from_sender_at(
        identity: &Identity,
        avatar_url: String,
        body: String,
        when: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: identity.user_id.clone(),
            full_name: identity.full_name.clone(),
            avatar_url,
            message: body,
            when,
        }
    }
}

/// The part of a client frame the server trusts
///
/// Clients may send a full [`ChatMessage`]-shaped object, but only `Message`
/// is kept. Identity fields and the timestamp are always set server-side.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundFrame {
    #[serde(rename = "Message")]
    pub message: String,
}

impl InboundFrame {
    /// Decode a frame payload
    pub fn decode(payload: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(payload)
    }
}
