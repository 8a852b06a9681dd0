//! Room and connection statistics

pub mod metrics;

pub use metrics::{ConnectionStats, RoomStats, RoomStatsSnapshot};
