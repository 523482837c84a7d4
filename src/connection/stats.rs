//! Per-connection traffic statistics.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::protocol::RequestType;

/// Packet counts for one request type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrafficCounts {
    pub received: u64,
    pub sent: u64,
}

/// Traffic seen on a connection, keyed by request type.
///
/// Entries appear on the first packet of a type; counts only grow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionStats {
    by_type: BTreeMap<RequestType, TrafficCounts>,
    /// Frames dropped by the receiver: bad header, zero or oversized payload.
    discarded_frames: u64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one received packet.
    pub fn record_received(&mut self, request_type: RequestType) {
        self.by_type.entry(request_type).or_default().received += 1;
    }

    /// Count one sent packet.
    pub fn record_sent(&mut self, request_type: RequestType) {
        self.by_type.entry(request_type).or_default().sent += 1;
    }

    /// Count one malformed frame dropped by the receiver.
    pub fn record_discarded(&mut self) {
        self.discarded_frames += 1;
    }

    /// Counts for `request_type`, `None` if no traffic of that type was seen.
    pub fn get(&self, request_type: RequestType) -> Option<TrafficCounts> {
        self.by_type.get(&request_type).copied()
    }

    /// Iterate over all types with traffic, in code order.
    pub fn iter(&self) -> impl Iterator<Item = (RequestType, TrafficCounts)> + '_ {
        self.by_type.iter().map(|(&ty, &counts)| (ty, counts))
    }

    pub fn total_received(&self) -> u64 {
        self.by_type.values().map(|c| c.received).sum()
    }

    pub fn total_sent(&self) -> u64 {
        self.by_type.values().map(|c| c.sent).sum()
    }

    /// Number of malformed frames dropped so far.
    pub fn discarded_frames(&self) -> u64 {
        self.discarded_frames
    }

    /// Render as JSON for diagnostics dumps.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
