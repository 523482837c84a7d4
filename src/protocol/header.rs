//! Wire format of the packet header.
//!
//! Implements the 9-byte header format:
//! ```text
//! ┌──────────┬──────────┬──────────┐
//! │ Magic    │ Type     │ Length   │
//! │ "FTSS"   │ 1 byte   │ 4 bytes  │
//! │ 4 bytes  │          │ uint32 HO│
//! └──────────┴──────────┴──────────┘
//! ```
//!
//! The length field is in host byte order (HO), with no padding. This keeps
//! the layout byte-compatible with existing peers on the same architecture.

use super::RequestType;

/// Magic bytes opening every frame.
pub const MAGIC: [u8; 4] = *b"FTSS";

/// Header size in bytes (fixed, exactly 9).
pub const HEADER_SIZE: usize = 9;

/// Offset of the request type byte.
pub const TYPE_OFFSET: usize = 4;

/// Offset of the payload length field.
pub const LENGTH_OFFSET: usize = 5;

/// Default upper bound for a received payload (16 MiB).
pub const DEFAULT_MAX_PAYLOAD_LEN: u32 = 16 * 1024 * 1024;

/// Decoded packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Frame identifier, `FTSS` for a valid frame.
    pub magic: [u8; 4],
    /// Message kind.
    pub request_type: RequestType,
    /// Number of payload bytes following the header.
    pub payload_len: u32,
}

impl PacketHeader {
    /// Create a header with the correct magic bytes.
    pub fn new(request_type: RequestType, payload_len: u32) -> Self {
        Self {
            magic: MAGIC,
            request_type,
            payload_len,
        }
    }

    /// Encode header to bytes.
    ///
    /// # Example
    ///
    /// ```
    /// use ftss_net::protocol::{PacketHeader, RequestType};
    ///
    /// let bytes = PacketHeader::new(RequestType::LOGIN, 10).encode();
    /// assert_eq!(&bytes[..4], b"FTSS");
    /// assert_eq!(bytes[4], 0x01);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        self.encode_into(&mut buf);
        buf
    }

    /// Encode header into an existing buffer.
    ///
    /// # Panics
    ///
    /// Panics if buffer is smaller than `HEADER_SIZE` (9 bytes).
    pub fn encode_into(&self, buf: &mut [u8]) {
        buf[..TYPE_OFFSET].copy_from_slice(&self.magic);
        buf[TYPE_OFFSET] = self.request_type.0;
        buf[LENGTH_OFFSET..HEADER_SIZE].copy_from_slice(&self.payload_len.to_ne_bytes());
    }

    /// Decode header from bytes.
    ///
    /// Returns `None` if buffer is too short. The magic bytes are copied
    /// as-is; use [`is_valid`](Self::is_valid) to check them.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            magic: [buf[0], buf[1], buf[2], buf[3]],
            request_type: RequestType(buf[TYPE_OFFSET]),
            payload_len: u32::from_ne_bytes([
                buf[LENGTH_OFFSET],
                buf[LENGTH_OFFSET + 1],
                buf[LENGTH_OFFSET + 2],
                buf[LENGTH_OFFSET + 3],
            ]),
        })
    }

    /// Magic bytes match and the type is below [`RequestType::MAX`].
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.magic == MAGIC && self.request_type.is_below_max()
    }

    /// Total frame length (header + payload).
    #[inline]
    pub fn frame_len(&self) -> usize {
        HEADER_SIZE + self.payload_len as usize
    }
}
