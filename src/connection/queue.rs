//! Bounded FIFO of received but not yet consumed packets.
//!
//! Packets that arrive while the caller waits for a different type are
//! parked here in arrival order. When the bound is exceeded the oldest
//! entries are dropped.

use std::collections::VecDeque;

use crate::config::DEFAULT_QUEUE_CAPACITY;
use crate::protocol::{Packet, RequestType};

/// Out-of-order packet queue.
#[derive(Debug)]
pub struct PacketQueue {
    packets: VecDeque<Packet>,
    capacity: usize,
}

impl PacketQueue {
    /// Create an empty queue holding at most `capacity` packets.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            packets: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append at the tail, evicting from the head while over capacity.
    pub fn push(&mut self, packet: Packet) {
        self.packets.push_back(packet);
        while self.packets.len() > self.capacity {
            if let Some(evicted) = self.packets.pop_front() {
                tracing::debug!(
                    request_type = %evicted.request_type(),
                    payload_len = evicted.payload_len(),
                    "Packet queue full, dropping oldest packet"
                );
            }
        }
    }

    /// Remove and return the first packet of type `filter`.
    ///
    /// With [`RequestType::NONE`] the oldest packet is returned regardless
    /// of type. The remaining packets keep their relative order.
    pub fn pop_first(&mut self, filter: RequestType) -> Option<Packet> {
        if filter == RequestType::NONE {
            return self.packets.pop_front();
        }
        let index = self
            .packets
            .iter()
            .position(|p| p.request_type() == filter)?;
        self.packets.remove(index)
    }

    /// Number of queued packets.
    #[inline]
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Maximum number of queued packets.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every queued packet, returning how many were dropped.
    pub fn clear(&mut self) -> usize {
        let n = self.packets.len();
        self.packets.clear();
        n
    }

    /// Iterate oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Packet> {
        self.packets.iter()
    }
}

impl Default for PacketQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}
