//! Statistics for the room and its connections

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Live room counters
///
/// Only the room's event loop writes these. Any task may read them through
/// [`RoomStats::snapshot`] without touching the membership registry.
#[derive(Debug)]
pub struct RoomStats {
    started_at: Instant,
    members: AtomicU64,
    joins: AtomicU64,
    leaves: AtomicU64,
    evictions: AtomicU64,
    messages: AtomicU64,
    deliveries: AtomicU64,
}

impl RoomStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            members: AtomicU64::new(0),
            joins: AtomicU64::new(0),
            leaves: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            messages: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
        }
    }

    pub(crate) fn set_members(&self, count: usize) {
        self.members.store(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_join(&self) {
        self.joins.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_leave(&self) {
        self.leaves.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_message(&self) {
        self.messages.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delivery(&self) {
        self.deliveries.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values
    pub fn snapshot(&self) -> RoomStatsSnapshot {
        RoomStatsSnapshot {
            members: self.members.load(Ordering::Relaxed),
            joins: self.joins.load(Ordering::Relaxed),
            leaves: self.leaves.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            messages: self.messages.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            uptime: self.started_at.elapsed(),
        }
    }
}

impl Default for RoomStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`RoomStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomStatsSnapshot {
    /// Current members
    pub members: u64,
    /// Joins processed
    pub joins: u64,
    /// Leaves that removed a member
    pub leaves: u64,
    /// Members removed because their queue stayed full
    pub evictions: u64,
    /// Messages taken off the forward queue
    pub messages: u64,
    /// Messages queued to individual members
    pub deliveries: u64,
    /// Time since the room started
    pub uptime: Duration,
}

/// Per-connection counters, owned by the connection's pumps
#[derive(Debug, Clone, Default)]
pub struct ConnectionStats {
    /// Frames read from the transport
    pub frames_received: u64,
    /// Messages forwarded to the room
    pub messages_forwarded: u64,
    /// Frames that could not be decoded
    pub decode_errors: u64,
    /// Messages written to the transport
    pub messages_sent: u64,
    /// Connection duration
    pub duration: Duration,
}

impl ConnectionStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self::default()
    }
}
