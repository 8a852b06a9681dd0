//! Per-connection duplex pumps
//!
//! Each connection runs two loops for its whole life:
//! - the inbound pump reads frames, enriches them and forwards them to the room
//! - the outbound pump drains the connection's outbound queue into the socket
//!
//! The inbound pump runs on the task that owns the connection; the outbound
//! pump is spawned. Either side can close the transport. Closing is a shared
//! [`CancellationToken`], so doing it twice is harmless.

use std::fmt::Display;
use std::time::Duration;

use axum::extract::ws::Message as WsMessage;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::room::{ConnectionId, InboundFrame, OutboundReceiver, Room};
use crate::stats::ConnectionStats;

use super::context::ConnectionContext;

/// Longest wait for the close handshake once the outbound pump stops
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// A client connection attached to the room
pub struct Connection {
    context: ConnectionContext,
    room: Room,
    closed: CancellationToken,
}

impl Connection {
    /// Create a connection for an upgraded transport
    pub fn new(context: ConnectionContext, room: Room) -> Self {
        Self {
            context,
            room,
            closed: CancellationToken::new(),
        }
    }

    /// Connection id
    pub fn id(&self) -> ConnectionId {
        self.context.connection_id
    }

    /// Join the room and pump frames until the connection ends
    ///
    /// Returns once both pumps have exited and the leave request is queued.
    pub async fn run<T, E>(self, transport: T) -> ConnectionStats
    where
        T: Stream<Item = Result<WsMessage, E>> + Sink<WsMessage> + Send + 'static,
        <T as Sink<WsMessage>>::Error: Display + Send,
        E: Display + Send,
    {
        let id = self.id();
        let (member, outbound) = self
            .room
            .new_member(id, self.context.identity.user_id.clone());

        if let Err(e) = self.room.join(member).await {
            tracing::warn!(connection_id = %id, error = %e, "Dropping connection");
            return ConnectionStats::new();
        }

        tracing::info!(
            connection_id = %id,
            user_id = %self.context.identity.user_id,
            peer = ?self.context.peer_addr,
            "Client connected"
        );

        let (sink, stream) = transport.split();
        let writer = tokio::spawn(outbound_pump(id, sink, outbound, self.closed.clone()));

        let mut stats = self.inbound_pump(stream).await;

        match writer.await {
            Ok(sent) => stats.messages_sent = sent,
            Err(e) => tracing::warn!(connection_id = %id, error = %e, "Outbound pump failed"),
        }
        stats.duration = self.context.connected_at.elapsed();

        tracing::info!(
            connection_id = %id,
            received = stats.frames_received,
            forwarded = stats.messages_forwarded,
            sent = stats.messages_sent,
            "Client disconnected"
        );

        stats
    }

    /// Read, enrich and forward frames until the transport fails or closes
    ///
    /// On exit closes the transport and sends this connection's leave
    /// request, once.
    pub async fn inbound_pump<S, E>(&self, mut stream: S) -> ConnectionStats
    where
        S: Stream<Item = Result<WsMessage, E>> + Unpin,
        E: Display,
    {
        let id = self.id();
        let mut stats = ConnectionStats::new();

        loop {
            let frame = tokio::select! {
                frame = stream.next() => frame,
                _ = self.closed.cancelled() => {
                    tracing::debug!(connection_id = %id, "Transport closed by outbound pump");
                    break;
                }
            };

            let decoded = match frame {
                Some(Ok(WsMessage::Text(text))) => InboundFrame::decode(text.as_str().as_bytes()),
                Some(Ok(WsMessage::Binary(data))) => InboundFrame::decode(&data),
                Some(Ok(WsMessage::Ping(_))) | Some(Ok(WsMessage::Pong(_))) => continue,
                Some(Ok(WsMessage::Close(frame))) => {
                    tracing::debug!(connection_id = %id, frame = ?frame, "Client closed connection");
                    break;
                }
                Some(Err(e)) => {
                    tracing::debug!(connection_id = %id, error = %e, "Read failed");
                    break;
                }
                None => {
                    tracing::debug!(connection_id = %id, "Stream ended");
                    break;
                }
            };
            stats.frames_received += 1;

            let inbound = match decoded {
                Ok(inbound) => inbound,
                Err(e) => {
                    stats.decode_errors += 1;
                    tracing::warn!(connection_id = %id, error = %e, "Undecodable frame, closing");
                    break;
                }
            };

            let message = self.context.enrich(inbound.message);
            if let Err(e) = self.room.forward(message).await {
                tracing::warn!(connection_id = %id, error = %e, "Forward failed, closing");
                break;
            }
            stats.messages_forwarded += 1;
        }

        self.closed.cancel();
        if let Err(e) = self.room.leave(id).await {
            tracing::debug!(connection_id = %id, error = %e, "Leave not delivered");
        }

        stats
    }
}

/// Write queued messages to the transport until the queue or transport closes
///
/// Never asks the room to leave; the inbound side does that. A write blocked
/// on a peer that stopped reading is abandoned as soon as the transport is
/// closed. Returns the number of messages written.
pub async fn outbound_pump<K>(
    id: ConnectionId,
    mut sink: K,
    mut queue: OutboundReceiver,
    closed: CancellationToken,
) -> u64
where
    K: Sink<WsMessage> + Unpin,
    K::Error: Display,
{
    let mut sent = 0;

    loop {
        let next = tokio::select! {
            next = queue.recv() => next,
            _ = closed.cancelled() => break,
        };

        let Some(message) = next else {
            tracing::debug!(connection_id = %id, "Outbound queue closed by room");
            break;
        };

        // Strings and a timestamp only, so encoding cannot fail.
        let text = match serde_json::to_string(message.as_ref()) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(connection_id = %id, error = %e, "Failed to encode message");
                continue;
            }
        };

        let written = tokio::select! {
            written = sink.send(WsMessage::Text(text.into())) => written,
            _ = closed.cancelled() => {
                tracing::debug!(connection_id = %id, "Transport closed during write");
                break;
            }
        };
        if let Err(e) = written {
            tracing::warn!(connection_id = %id, error = %e, "Write failed, closing");
            break;
        }
        sent += 1;
    }

    closed.cancel();
    // Releases a room blocked on this queue before the close handshake.
    drop(queue);

    // Sends a close frame if the socket still accepts one.
    if tokio::time::timeout(CLOSE_TIMEOUT, sink.close()).await.is_err() {
        tracing::debug!(connection_id = %id, "Close handshake timed out");
    }

    sent
}
