//! Connection module - the capability set every transport offers.
//!
//! Application code talks to a [`Connection`]; it never needs to know
//! which transport sits underneath. Today the only implementation is the
//! stream-backed [`TransportConnection`](crate::transport::TransportConnection),
//! which works over TCP or, in tests, over an in-memory pipe.
//!
//! # Example
//!
//! ```ignore
//! use ftss_net::{Connection, Packet, RequestType};
//!
//! async fn login(conn: &mut dyn Connection) -> ftss_net::Result<i32> {
//!     let mut packet = Packet::new(RequestType::LOGIN);
//!     packet.append_str("user")?.append_str("md5-of-password")?;
//!
//!     // On success `packet` now holds the response.
//!     conn.mreq(&mut packet).await?;
//!     Ok(packet.get::<i32>())
//! }
//! ```

mod queue;
mod stats;

use std::net::SocketAddr;

use async_trait::async_trait;

use crate::config::MaxWait;
use crate::error::Result;
use crate::protocol::{Packet, RequestType};

pub use queue::PacketQueue;
pub use stats::{ConnectionStats, TrafficCounts};

/// A packet connection to one counterpart.
///
/// A connection is driven by one task at a time; every I/O method takes
/// `&mut self`. Socket-level failures are fatal: the connection becomes
/// disconnected and must be re-established.
#[async_trait]
pub trait Connection: Send {
    /// Whether the connection was up after the last I/O operation.
    fn is_connected(&self) -> bool;

    /// Close the connection and drop all queued packets.
    fn disconnect(&mut self);

    /// Address of the counterpart, if known.
    fn counterpart_address(&self) -> Option<SocketAddr>;

    /// Send a packet as one frame.
    async fn send(&mut self, packet: &Packet) -> Result<()>;

    /// Wait up to the max wait for the next packet.
    ///
    /// With `use_queue` a queued packet is returned first, without waiting.
    async fn wait_for_then_get_packet(&mut self, use_queue: bool) -> Option<Packet>;

    /// Like [`wait_for_then_get_packet`](Self::wait_for_then_get_packet),
    /// but only returns a packet whose first bytes are already available.
    async fn get_packet_if_present(&mut self, use_queue: bool) -> Option<Packet>;

    /// Oldest queued packet, else a packet arriving within a short poll.
    async fn get_received_packet_if_any(&mut self) -> Option<Packet>;

    /// Wait for a packet of a specific type.
    ///
    /// The queue is searched first. Packets of other types arriving in the
    /// meantime are queued. Returns `None` for the `NONE` sentinel, for
    /// codes above `MAX`, or when nothing matching arrives in time.
    async fn wait_for_then_get_packet_with_type(
        &mut self,
        request_type: RequestType,
    ) -> Option<Packet>;

    /// Zero-wait variant of
    /// [`wait_for_then_get_packet_with_type`](Self::wait_for_then_get_packet_with_type).
    async fn get_packet_with_type_if_present(&mut self, request_type: RequestType)
        -> Option<Packet>;

    /// Send `packet` and wait for the response of the same type.
    ///
    /// On success the response replaces the contents of `packet`, rewound
    /// and ready for reading. The request payload is gone either way once
    /// this returns `Ok`; on error `packet` is left as sent.
    async fn mreq(&mut self, packet: &mut Packet) -> Result<()>;

    /// Change the bound on connect, receive and `mreq` waits.
    fn set_max_wait(&mut self, max_wait: MaxWait);

    /// Current bound on blocking waits.
    fn max_wait(&self) -> MaxWait;

    /// Traffic counters.
    fn stats(&self) -> &ConnectionStats;

    /// Packets received while waiting for something else.
    fn queue(&self) -> &PacketQueue;

    /// Mutable access to the packet queue.
    fn queue_mut(&mut self) -> &mut PacketQueue;

    /// Remove the first queued packet of type `filter` (`NONE`: any type).
    fn first_packet_from_queue(&mut self, filter: RequestType) -> Option<Packet> {
        self.queue_mut().pop_first(filter)
    }

    /// Park a packet in the queue, evicting the oldest when full.
    fn queue_packet(&mut self, packet: Packet) {
        self.queue_mut().push(packet);
    }
}
