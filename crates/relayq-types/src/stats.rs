//! Statistics types for RelayQ
//!
//! Snapshot types exposed by the relay and by channel implementations.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Relay statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RelayStats {
    /// Admission gate capacity (maximum concurrent relay tasks)
    pub capacity: usize,

    /// Relay tasks currently holding a gate slot
    pub in_flight: usize,

    /// Number of configured sinks
    pub sinks: usize,
}

/// Inbound channel statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ChannelStats {
    /// Messages waiting to be dispatched
    pub queued: usize,

    /// Messages delivered but not yet acknowledged
    pub unacked: usize,

    /// Number of registered consumers
    pub consumers: usize,

    /// Whether the dispatch loop is running
    pub consuming: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_serialize() {
        let stats = RelayStats {
            capacity: 4,
            in_flight: 2,
            sinks: 3,
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["capacity"], 4);
        assert_eq!(json["in_flight"], 2);
        assert_eq!(json["sinks"], 3);
    }
}
