//! Protocol module - wire format, request types, packets and resync.
//!
//! This module implements the packet layer of the protocol:
//! - 9-byte header encoding/decoding
//! - Request type codes and sentinels
//! - Packet with cursor-based typed append/get
//! - Magic byte scanner for locating frame boundaries in a raw stream

mod header;
mod packet;
mod request_type;
mod scalar;
mod scanner;

pub use header::{
    PacketHeader, DEFAULT_MAX_PAYLOAD_LEN, HEADER_SIZE, LENGTH_OFFSET, MAGIC, TYPE_OFFSET,
};
pub use packet::Packet;
pub use request_type::RequestType;
pub use scalar::Scalar;
pub use scanner::{MagicScanner, ScanState, ScanStep};
