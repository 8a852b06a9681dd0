//! Room hub implementation
//!
//! The central broadcast hub. One event loop task owns the membership
//! registry and serializes every join, leave and broadcast. Everything else
//! talks to it through the queues behind a cloneable [`Room`] handle.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::stats::{RoomStats, RoomStatsSnapshot};
use crate::trace::{self, Tracer};

use super::config::{FanoutMode, RoomConfig};
use super::error::RoomError;
use super::member::{Delivery, Member, OutboundReceiver};
use super::message::{ChatMessage, ConnectionId};

/// Handle to the room's event loop
///
/// Cheap to clone. Holding a handle does not give access to the membership
/// registry: only the event loop reads or writes it.
#[derive(Clone)]
pub struct Room {
    join_tx: mpsc::Sender<Member>,
    leave_tx: mpsc::Sender<ConnectionId>,
    forward_tx: mpsc::Sender<Arc<ChatMessage>>,
    stats: Arc<RoomStats>,
    outbound_capacity: usize,
}

impl Room {
    /// Start a room with the given configuration and no tracer
    ///
    /// Returns the handle and the event loop task. The loop runs until every
    /// handle has been dropped.
    pub fn spawn(config: RoomConfig) -> (Self, JoinHandle<()>) {
        Self::spawn_with_tracer(config, Arc::new(trace::off()))
    }

    /// Start a room that reports its activity to `tracer`
    pub fn spawn_with_tracer(
        config: RoomConfig,
        tracer: Arc<dyn Tracer>,
    ) -> (Self, JoinHandle<()>) {
        let (join_tx, join_rx) = mpsc::channel(config.control_capacity.max(1));
        let (leave_tx, leave_rx) = mpsc::channel(config.control_capacity.max(1));
        let (forward_tx, forward_rx) = mpsc::channel(config.forward_capacity.max(1));
        let stats = Arc::new(RoomStats::new());

        let event_loop = RoomLoop {
            members: HashMap::new(),
            join_rx,
            leave_rx,
            forward_rx,
            fanout: config.fanout,
            tracer,
            stats: Arc::clone(&stats),
        };
        let task = tokio::spawn(event_loop.run());

        let room = Self {
            join_tx,
            leave_tx,
            forward_tx,
            stats,
            outbound_capacity: config.outbound_capacity.max(1),
        };
        (room, task)
    }

    /// Create a member for a new connection, with an outbound queue sized
    /// from the room configuration
    pub fn new_member(
        &self,
        id: ConnectionId,
        user_id: impl Into<String>,
    ) -> (Member, OutboundReceiver) {
        Member::channel(id, user_id, self.outbound_capacity)
    }

    /// Add a member to the room
    ///
    /// Call at most once per connection.
    pub async fn join(&self, member: Member) -> Result<(), RoomError> {
        self.join_tx.send(member).await.map_err(|_| RoomError::Closed)
    }

    /// Remove a member from the room and close its outbound queue
    ///
    /// Leaving twice, or leaving without ever joining, is a no-op.
    pub async fn leave(&self, id: ConnectionId) -> Result<(), RoomError> {
        self.leave_tx.send(id).await.map_err(|_| RoomError::Closed)
    }

    /// Queue a message for broadcast to every member
    ///
    /// Returns once the message is on the forward queue, which may mean
    /// waiting while the queue is full.
    pub async fn forward(&self, message: ChatMessage) -> Result<(), RoomError> {
        self.forward_shared(Arc::new(message)).await
    }

    /// Queue an already shared message for broadcast
    pub async fn forward_shared(&self, message: Arc<ChatMessage>) -> Result<(), RoomError> {
        self.forward_tx
            .send(message)
            .await
            .map_err(|_| RoomError::Closed)
    }

    /// Get room statistics
    pub fn stats(&self) -> RoomStatsSnapshot {
        self.stats.snapshot()
    }
}

/// State owned by the room's event loop task
struct RoomLoop {
    /// Membership registry. Touched by nothing but this loop.
    members: HashMap<ConnectionId, Member>,
    join_rx: mpsc::Receiver<Member>,
    leave_rx: mpsc::Receiver<ConnectionId>,
    forward_rx: mpsc::Receiver<Arc<ChatMessage>>,
    fanout: FanoutMode,
    tracer: Arc<dyn Tracer>,
    stats: Arc<RoomStats>,
}

impl RoomLoop {
    /// Handle one queued request at a time until every handle is gone
    ///
    /// `select!` picks randomly among ready queues; each queue stays FIFO.
    async fn run(mut self) {
        tracing::debug!(fanout = ?self.fanout, "Room event loop started");

        loop {
            tokio::select! {
                Some(member) = self.join_rx.recv() => self.handle_join(member),
                Some(id) = self.leave_rx.recv() => self.handle_leave(id),
                Some(message) = self.forward_rx.recv() => self.handle_forward(message).await,
                else => break,
            }
        }

        tracing::debug!(
            members = self.members.len(),
            "Room event loop stopped, closing remaining members"
        );
    }

    fn handle_join(&mut self, member: Member) {
        let id = member.id;
        let user_id = member.user_id.clone();

        if let Some(previous) = self.members.insert(id, member) {
            tracing::warn!(
                connection_id = %id,
                user_id = %previous.user_id,
                "Connection joined twice, replacing earlier registration"
            );
        }

        self.stats.record_join();
        self.stats.set_members(self.members.len());
        self.tracer.trace("New client joined.");

        tracing::info!(
            connection_id = %id,
            user_id = %user_id,
            members = self.members.len(),
            "Client joined"
        );
    }

    fn handle_leave(&mut self, id: ConnectionId) {
        // Dropping the member drops the queue's only sender, which closes it.
        match self.members.remove(&id) {
            Some(member) => {
                self.stats.record_leave();
                self.stats.set_members(self.members.len());
                self.tracer.trace("Client left.");

                tracing::info!(
                    connection_id = %id,
                    user_id = %member.user_id,
                    members = self.members.len(),
                    "Client left"
                );
            }
            None => {
                tracing::debug!(connection_id = %id, "Leave for unknown connection ignored");
            }
        }
    }

    /// Push a message onto every member's outbound queue
    ///
    /// In blocking mode a full queue stalls this loop, and so every member,
    /// until it drains or its consumer goes away.
    async fn handle_forward(&mut self, message: Arc<ChatMessage>) {
        self.stats.record_message();
        self.tracer
            .trace(&format!("Message received: {}", message.message));

        tracing::debug!(
            user_id = %message.user_id,
            members = self.members.len(),
            "Broadcasting message"
        );

        let mut evicted = Vec::new();

        for member in self.members.values() {
            if member.is_disconnected() {
                tracing::debug!(connection_id = %member.id, "Member already gone, skipping");
                continue;
            }

            let delivery = match self.fanout {
                FanoutMode::Blocking => member.push(Arc::clone(&message)).await,
                FanoutMode::Evict { timeout } => {
                    member.push_timeout(Arc::clone(&message), timeout).await
                }
            };

            match delivery {
                Delivery::Queued => {
                    self.stats.record_delivery();
                    self.tracer.trace(" -- sent to client.");
                }
                Delivery::Disconnected => {
                    // Its inbound pump will send the leave request.
                    tracing::debug!(
                        connection_id = %member.id,
                        "Skipping member whose outbound pump has exited"
                    );
                }
                Delivery::TimedOut => {
                    tracing::warn!(
                        connection_id = %member.id,
                        user_id = %member.user_id,
                        "Outbound queue stayed full, evicting slow member"
                    );
                    evicted.push(member.id);
                }
            }
        }

        for id in evicted {
            if self.members.remove(&id).is_some() {
                self.stats.record_eviction();
                self.tracer.trace("Client evicted.");
            }
        }
        self.stats.set_members(self.members.len());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::task::Poll;
    use std::time::Duration;

    use chrono::Utc;
    use tokio::time::timeout;
    use tokio_test::assert_pending;

    use super::*;

    fn msg(body: &str) -> ChatMessage {
        ChatMessage {
            user_id: "sender".into(),
            full_name: "Sender".into(),
            avatar_url: String::new(),
            message: body.into(),
            when: Utc::now(),
        }
    }

    /// Yield until the room's counters satisfy `check`
    async fn settle(room: &Room, check: impl Fn(&RoomStatsSnapshot) -> bool) {
        for _ in 0..10_000 {
            if check(&room.stats()) {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("room never reached expected state: {:?}", room.stats());
    }

    async fn drain(rx: &mut OutboundReceiver, wait: Duration) -> Vec<String> {
        let mut seen = Vec::new();
        while let Ok(Some(m)) = timeout(wait, rx.recv()).await {
            seen.push(m.message.clone());
        }
        seen
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl Tracer for Recorder {
        fn trace(&self, line: &str) {
            self.0.lock().unwrap().push(line.to_string());
        }
    }

    #[tokio::test]
    async fn test_join_and_broadcast() {
        let (room, _task) = Room::spawn(RoomConfig::default());
        let (a, mut a_rx) = room.new_member(ConnectionId(1), "a");
        let (b, mut b_rx) = room.new_member(ConnectionId(2), "b");

        room.join(a).await.unwrap();
        room.join(b).await.unwrap();
        settle(&room, |s| s.members == 2).await;

        room.forward(msg("hello")).await.unwrap();

        assert_eq!(a_rx.recv().await.unwrap().message, "hello");
        assert_eq!(b_rx.recv().await.unwrap().message, "hello");
        settle(&room, |s| s.deliveries == 2).await;
        assert_eq!(room.stats().messages, 1);
    }

    #[tokio::test]
    async fn test_members_share_global_order() {
        let (room, _task) = Room::spawn(RoomConfig::default());
        let mut receivers = Vec::new();
        for i in 0..3 {
            let (member, rx) = room.new_member(ConnectionId(i), format!("user-{}", i));
            room.join(member).await.unwrap();
            receivers.push(rx);
        }
        settle(&room, |s| s.members == 3).await;

        // Three concurrent senders interleave on the forward queue.
        let mut senders = Vec::new();
        for sender in 0..3 {
            let room = room.clone();
            senders.push(tokio::spawn(async move {
                for n in 0..20 {
                    room.forward(msg(&format!("{}-{}", sender, n))).await.unwrap();
                }
            }));
        }
        for sender in senders {
            sender.await.unwrap();
        }

        let mut sequences = Vec::new();
        for rx in receivers.iter_mut() {
            let mut seq = Vec::new();
            for _ in 0..60 {
                seq.push(rx.recv().await.unwrap().message.clone());
            }
            sequences.push(seq);
        }

        assert_eq!(sequences[0], sequences[1]);
        assert_eq!(sequences[1], sequences[2]);

        // Each sender's own messages keep their relative order.
        for sender in 0..3 {
            let prefix = format!("{}-", sender);
            let own: Vec<_> = sequences[0]
                .iter()
                .filter(|m| m.starts_with(&prefix))
                .cloned()
                .collect();
            let expected: Vec<_> = (0..20).map(|n| format!("{}-{}", sender, n)).collect();
            assert_eq!(own, expected);
        }
    }

    #[tokio::test]
    async fn test_join_then_broadcast_race() {
        let (room, _task) = Room::spawn(RoomConfig::default());
        let (a, mut a_rx) = room.new_member(ConnectionId(1), "a");
        room.join(a).await.unwrap();
        settle(&room, |s| s.joins == 1).await;

        room.forward(msg("m1")).await.unwrap();
        assert_eq!(a_rx.recv().await.unwrap().message, "m1");

        // Late joiner only sees what is broadcast after its join.
        let (b, mut b_rx) = room.new_member(ConnectionId(2), "b");
        room.join(b).await.unwrap();
        settle(&room, |s| s.joins == 2).await;

        room.forward(msg("m2")).await.unwrap();
        assert_eq!(a_rx.recv().await.unwrap().message, "m2");
        assert_eq!(b_rx.recv().await.unwrap().message, "m2");

        // A member that left gets nothing more and its queue is closed.
        room.leave(ConnectionId(1)).await.unwrap();
        settle(&room, |s| s.leaves == 1).await;

        room.forward(msg("m3")).await.unwrap();
        assert_eq!(b_rx.recv().await.unwrap().message, "m3");
        assert!(a_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_leave_is_idempotent() {
        let (room, _task) = Room::spawn(RoomConfig::default());

        // Never joined
        room.leave(ConnectionId(42)).await.unwrap();

        let (a, mut a_rx) = room.new_member(ConnectionId(1), "a");
        let (b, mut b_rx) = room.new_member(ConnectionId(2), "b");
        room.join(a).await.unwrap();
        room.join(b).await.unwrap();
        settle(&room, |s| s.joins == 2).await;

        room.leave(ConnectionId(1)).await.unwrap();
        room.leave(ConnectionId(1)).await.unwrap();
        settle(&room, |s| s.leaves == 1 && s.members == 1).await;

        room.forward(msg("still alive")).await.unwrap();
        assert_eq!(b_rx.recv().await.unwrap().message, "still alive");
        assert!(a_rx.recv().await.is_none());

        let stats = room.stats();
        assert_eq!(stats.leaves, 1);
        assert_eq!(stats.members, 1);
    }

    #[tokio::test]
    async fn test_disconnected_member_does_not_fault() {
        let (room, _task) = Room::spawn(RoomConfig::default());
        let (a, a_rx) = room.new_member(ConnectionId(1), "a");
        let (b, mut b_rx) = room.new_member(ConnectionId(2), "b");
        room.join(a).await.unwrap();
        room.join(b).await.unwrap();
        settle(&room, |s| s.joins == 2).await;

        // Outbound pump gone, leave not yet processed.
        drop(a_rx);

        room.forward(msg("after")).await.unwrap();
        assert_eq!(b_rx.recv().await.unwrap().message, "after");
        settle(&room, |s| s.messages == 1).await;
        assert_eq!(room.stats().deliveries, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_queue_stalls_room_until_disconnect() {
        let config = RoomConfig::default().forward_capacity(1);
        let (room, _task) = Room::spawn(config);

        // `stalled` never drains its single-slot queue.
        let (stalled, stalled_rx) = Member::channel(ConnectionId(1), "stalled", 1);
        let (healthy, mut healthy_rx) = Member::channel(ConnectionId(2), "healthy", 16);
        room.join(stalled).await.unwrap();
        room.join(healthy).await.unwrap();
        settle(&room, |s| s.joins == 2).await;

        room.forward(msg("m1")).await.unwrap();
        room.forward(msg("m2")).await.unwrap();
        // Returns once m2 has been taken off the forward queue.
        room.forward(msg("m3")).await.unwrap();

        // The loop is stuck pushing m2, so the forward queue stays full.
        let mut blocked = tokio_test::task::spawn(room.forward(msg("m4")));
        assert_pending!(blocked.poll());

        let seen = drain(&mut healthy_rx, Duration::from_millis(100)).await;
        assert_eq!(seen.first().map(String::as_str), Some("m1"));
        assert!(!seen.iter().any(|m| m == "m3"));
        assert_eq!(room.stats().messages, 2);

        // Disconnecting the stalled member releases the loop.
        drop(stalled_rx);

        let forwarded = loop {
            if let Poll::Ready(result) = blocked.poll() {
                break result;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        };
        assert!(forwarded.is_ok());

        let mut all = seen;
        all.extend(drain(&mut healthy_rx, Duration::from_millis(100)).await);
        assert_eq!(all, vec!["m1", "m2", "m3", "m4"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_evict_mode_drops_slow_member() {
        let config = RoomConfig::default().evict_slow_members(Duration::from_millis(50));
        let (room, _task) = Room::spawn(config);

        let (slow, mut slow_rx) = Member::channel(ConnectionId(1), "slow", 1);
        let (fast, mut fast_rx) = Member::channel(ConnectionId(2), "fast", 16);
        room.join(slow).await.unwrap();
        room.join(fast).await.unwrap();
        settle(&room, |s| s.joins == 2).await;

        room.forward(msg("m1")).await.unwrap();
        room.forward(msg("m2")).await.unwrap();
        room.forward(msg("m3")).await.unwrap();

        let seen = drain(&mut fast_rx, Duration::from_millis(500)).await;
        assert_eq!(seen, vec!["m1", "m2", "m3"]);

        // The slow member kept what fit and then had its queue closed.
        assert_eq!(slow_rx.recv().await.unwrap().message, "m1");
        assert!(slow_rx.recv().await.is_none());

        // Its own leave request arrives later and is a no-op.
        room.leave(ConnectionId(1)).await.unwrap();
        settle(&room, |s| s.messages == 3).await;
        let stats = room.stats();
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.leaves, 0);
        assert_eq!(stats.members, 1);
    }

    #[tokio::test]
    async fn test_tracer_sees_room_activity() {
        let recorder = Arc::new(Recorder::default());
        let (room, _task) = Room::spawn_with_tracer(RoomConfig::default(), recorder.clone());

        let (a, mut a_rx) = room.new_member(ConnectionId(1), "a");
        room.join(a).await.unwrap();
        settle(&room, |s| s.joins == 1).await;

        room.forward(msg("hi")).await.unwrap();
        a_rx.recv().await.unwrap();

        room.leave(ConnectionId(1)).await.unwrap();
        settle(&room, |s| s.leaves == 1).await;

        let lines = recorder.0.lock().unwrap().clone();
        assert_eq!(
            lines,
            vec![
                "New client joined.",
                "Message received: hi",
                " -- sent to client.",
                "Client left.",
            ]
        );
    }

    #[tokio::test]
    async fn test_loop_stops_when_handles_dropped() {
        let (room, task) = Room::spawn(RoomConfig::default());
        let (a, mut a_rx) = room.new_member(ConnectionId(1), "a");
        room.join(a).await.unwrap();
        settle(&room, |s| s.joins == 1).await;

        let other = room.clone();
        drop(room);
        drop(other);

        task.await.unwrap();
        // Remaining members' queues close with the loop.
        assert!(a_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_requests_fail_after_loop_stops() {
        let (room, task) = Room::spawn(RoomConfig::default());
        task.abort();
        let _ = task.await;

        assert_eq!(room.forward(msg("x")).await, Err(RoomError::Closed));
        assert_eq!(room.leave(ConnectionId(1)).await, Err(RoomError::Closed));

        let (a, _rx) = room.new_member(ConnectionId(1), "a");
        assert_eq!(room.join(a).await, Err(RoomError::Closed));
    }
}
