//! Connection context
//!
//! Read-only information about a connection, fixed when it is accepted.

use std::net::SocketAddr;
use std::time::Instant;

use crate::identity::{Avatar, Identity};
use crate::room::{ChatMessage, ConnectionId};

/// Context of one client connection
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    /// Unique connection id
    pub connection_id: ConnectionId,

    /// Remote peer address, when the front door knows it
    pub peer_addr: Option<SocketAddr>,

    /// Identity snapshot taken at join time
    pub identity: Identity,

    /// Avatar strategy used when enriching messages
    pub avatar: Avatar,

    /// When the connection was accepted
    pub connected_at: Instant,
}

impl ConnectionContext {
    /// Create a new context
    pub fn new(connection_id: ConnectionId, identity: Identity, avatar: Avatar) -> Self {
        Self {
            connection_id,
            peer_addr: None,
            identity,
            avatar,
            connected_at: Instant::now(),
        }
    }

    /// Record the remote address
    pub fn with_peer_addr(mut self, addr: SocketAddr) -> Self {
        self.peer_addr = Some(addr);
        self
    }

    /// Turn a client-supplied body into a broadcastable message
    ///
    /// Sender fields come from the identity snapshot, never from the client.
    /// A missing avatar leaves the URL empty.
    pub fn enrich(&self, body: String) -> ChatMessage {
        let avatar_url = self.identity.avatar_url(self.avatar);
        ChatMessage::from_sender(&self.identity, avatar_url, body)
    }
}
