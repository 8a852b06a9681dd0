//! Room member entry
//!
//! A member is the room's half of a connection: the id, a label for logs, and
//! the producer side of the connection's outbound queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use super::message::{ChatMessage, ConnectionId};

/// Consumer side of a member's outbound queue, owned by the outbound pump
pub type OutboundReceiver = mpsc::Receiver<Arc<ChatMessage>>;

/// Result of pushing one message onto a member's outbound queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Delivery {
    /// Message was queued
    Queued,
    /// The outbound pump has exited and dropped its receiver
    Disconnected,
    /// The queue stayed full for the whole deadline
    TimedOut,
}

/// Entry for a single connection in the room
///
/// The room holds the only `Sender` of the outbound queue, so removing the
/// member from the room is what closes the queue. A connection never closes
/// its own queue.
#[derive(Debug)]
pub struct Member {
    /// Connection id
    pub id: ConnectionId,

    /// User id of the connection's owner, for logs and traces
    pub user_id: String,

    /// Producer side of the outbound queue
    outbound: mpsc::Sender<Arc<ChatMessage>>,
}

impl Member {
    /// Create a member and its outbound queue with the given capacity
    pub fn channel(
        id: ConnectionId,
        user_id: impl Into<String>,
        capacity: usize,
    ) -> (Self, OutboundReceiver) {
        let (outbound, rx) = mpsc::channel(capacity.max(1));
        let member = Self {
            id,
            user_id: user_id.into(),
            outbound,
        };
        (member, rx)
    }

    /// Push a message, waiting as long as the queue is full
    pub(super) async fn push(&self, message: Arc<ChatMessage>) -> Delivery {
        match self.outbound.send(message).await {
            Ok(()) => Delivery::Queued,
            Err(_) => Delivery::Disconnected,
        }
    }

    /// Push a message, waiting at most `timeout` for room in the queue
    pub(super) async fn push_timeout(
        &self,
        message: Arc<ChatMessage>,
        timeout: Duration,
    ) -> Delivery {
        match self.outbound.send_timeout(message, timeout).await {
            Ok(()) => Delivery::Queued,
            Err(mpsc::error::SendTimeoutError::Closed(_)) => Delivery::Disconnected,
            Err(mpsc::error::SendTimeoutError::Timeout(_)) => Delivery::TimedOut,
        }
    }

    /// Whether the outbound pump has already gone away
    pub fn is_disconnected(&self) -> bool {
        self.outbound.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn message(body: &str) -> Arc<ChatMessage> {
        Arc::new(ChatMessage {
            user_id: "u".into(),
            full_name: "U".into(),
            avatar_url: String::new(),
            message: body.into(),
            when: Utc::now(),
        })
    }

    #[tokio::test]
    async fn test_push_queues_message() {
        let (member, mut rx) = Member::channel(ConnectionId(1), "u", 4);

        assert_eq!(member.push(message("a")).await, Delivery::Queued);
        assert_eq!(rx.recv().await.unwrap().message, "a");
    }

    #[tokio::test]
    async fn test_push_after_receiver_dropped() {
        let (member, rx) = Member::channel(ConnectionId(1), "u", 4);
        drop(rx);

        assert!(member.is_disconnected());
        assert_eq!(member.push(message("a")).await, Delivery::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_push_timeout_on_full_queue() {
        let (member, _rx) = Member::channel(ConnectionId(1), "u", 1);

        assert_eq!(
            member.push_timeout(message("a"), Duration::from_secs(1)).await,
            Delivery::Queued
        );
        assert_eq!(
            member.push_timeout(message("b"), Duration::from_secs(1)).await,
            Delivery::TimedOut
        );
    }

    #[tokio::test]
    async fn test_dropping_member_closes_queue() {
        let (member, mut rx) = Member::channel(ConnectionId(1), "u", 4);
        member.push(message("last")).await;
        drop(member);

        assert_eq!(rx.recv().await.unwrap().message, "last");
        assert!(rx.recv().await.is_none());
    }
}
