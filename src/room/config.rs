//! Room configuration

use std::time::Duration;

/// Default capacity of each member's outbound queue
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

/// Default capacity of the forward queue
pub const DEFAULT_FORWARD_CAPACITY: usize = 64;

/// Default capacity of the join and leave queues
pub const DEFAULT_CONTROL_CAPACITY: usize = 64;

/// How the room pushes a message onto a member's outbound queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FanoutMode {
    /// Wait for room in the queue however long it takes.
    ///
    /// A member whose queue stays full stalls the room loop, and with it
    /// delivery to every other member, until the queue drains or that member
    /// disconnects.
    #[default]
    Blocking,

    /// Wait at most `timeout` for room in the queue, then evict the member.
    ///
    /// Eviction removes the member and closes its outbound queue, which ends
    /// its connection. Other members keep receiving.
    Evict {
        /// Longest time a single push may wait
        timeout: Duration,
    },
}

/// Room configuration options
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Capacity of each member's outbound queue
    pub outbound_capacity: usize,

    /// Capacity of the forward (broadcast) queue
    pub forward_capacity: usize,

    /// Capacity of the join and leave queues
    pub control_capacity: usize,

    /// Fan-out policy
    pub fanout: FanoutMode,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            forward_capacity: DEFAULT_FORWARD_CAPACITY,
            control_capacity: DEFAULT_CONTROL_CAPACITY,
            fanout: FanoutMode::Blocking,
        }
    }
}

impl RoomConfig {
    /// Set the outbound queue capacity (at least 1)
    pub fn outbound_capacity(mut self, capacity: usize) -> Self {
        self.outbound_capacity = capacity.max(1);
        self
    }

    /// Set the forward queue capacity (at least 1)
    pub fn forward_capacity(mut self, capacity: usize) -> Self {
        self.forward_capacity = capacity.max(1);
        self
    }

    /// Set the join/leave queue capacity (at least 1)
    pub fn control_capacity(mut self, capacity: usize) -> Self {
        self.control_capacity = capacity.max(1);
        self
    }

    /// Set the fan-out policy
    pub fn fanout(mut self, mode: FanoutMode) -> Self {
        self.fanout = mode;
        self
    }

    /// Evict members whose queue stays full longer than `timeout`
    pub fn evict_slow_members(self, timeout: Duration) -> Self {
        self.fanout(FanoutMode::Evict { timeout })
    }
}
