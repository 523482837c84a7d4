//! Packet: one header + payload unit with a read/write cursor.
//!
//! A [`Packet`] owns a single contiguous buffer holding the encoded header
//! followed by the payload, so the buffer is always the exact wire image.
//! Values are appended at the cursor and read back from the cursor; both
//! advance it by the width of the value.
//!
//! Invariants kept by every operation:
//! - `total_len() == HEADER_SIZE + payload_len()` and the header length
//!   field always matches
//! - `cursor() >= HEADER_SIZE` while the packet holds a buffer
//! - reads never extend past `total_len()`
//!
//! # Example
//!
//! ```
//! use ftss_net::protocol::{Packet, RequestType};
//!
//! let mut packet = Packet::new(RequestType::LOGIN);
//! packet.append(1234i32).unwrap().append_str("Hello").unwrap();
//! assert_eq!(packet.payload_len(), 4 + 6);
//!
//! packet.rewind();
//! assert_eq!(packet.get::<i32>(), 1234);
//! assert_eq!(packet.get_string(), "Hello");
//! ```

use std::fmt;

use super::header::{PacketHeader, HEADER_SIZE, LENGTH_OFFSET, TYPE_OFFSET};
use super::{RequestType, Scalar};
use crate::error::PacketError;

type Result<T> = std::result::Result<T, PacketError>;

/// A protocol packet.
pub struct Packet {
    /// Header followed by payload. Empty after the buffer was transferred away.
    buf: Vec<u8>,
    /// Absolute offset of the next read/write.
    cursor: usize,
}

impl Packet {
    /// Create an empty packet of the given type.
    ///
    /// The cursor points at the first payload byte.
    pub fn new(request_type: RequestType) -> Self {
        Self {
            buf: PacketHeader::new(request_type, 0).encode().to_vec(),
            cursor: HEADER_SIZE,
        }
    }

    /// Create a packet with a copy of `payload`, cursor rewound.
    pub fn from_parts(request_type: RequestType, payload: &[u8]) -> Result<Self> {
        if payload.len() > u32::MAX as usize {
            return Err(PacketError::TooLarge(payload.len()));
        }
        let mut buf = Vec::new();
        buf.try_reserve_exact(HEADER_SIZE + payload.len())
            .map_err(|_| PacketError::AllocationFailed(HEADER_SIZE + payload.len()))?;
        buf.extend_from_slice(&PacketHeader::new(request_type, payload.len() as u32).encode());
        buf.extend_from_slice(payload);
        Ok(Self {
            buf,
            cursor: HEADER_SIZE,
        })
    }

    // ------------------------------------------------------------------------
    // Header access
    // ------------------------------------------------------------------------

    /// Decoded header, `None` if the buffer was transferred away.
    pub fn header(&self) -> Option<PacketHeader> {
        PacketHeader::decode(&self.buf)
    }

    /// Magic bytes are `FTSS` and the type is below [`RequestType::MAX`].
    pub fn is_valid(&self) -> bool {
        self.header().is_some_and(|h| h.is_valid())
    }

    /// The packet type, `NULL` if the packet holds no buffer.
    pub fn request_type(&self) -> RequestType {
        self.buf
            .get(TYPE_OFFSET)
            .map_or(RequestType::NULL, |&b| RequestType(b))
    }

    /// Change the packet type.
    pub fn set_request_type(&mut self, request_type: RequestType) -> &mut Self {
        if let Some(b) = self.buf.get_mut(TYPE_OFFSET) {
            *b = request_type.0;
        }
        self
    }

    /// Header + payload length in bytes.
    #[inline]
    pub fn total_len(&self) -> usize {
        self.buf.len()
    }

    /// Payload length in bytes.
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.buf.len().saturating_sub(HEADER_SIZE)
    }

    /// Payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.buf[HEADER_SIZE.min(self.buf.len())..]
    }

    /// Mutable payload bytes, for filling a freshly sized packet from a socket.
    #[inline]
    pub(crate) fn payload_mut(&mut self) -> &mut [u8] {
        let start = HEADER_SIZE.min(self.buf.len());
        &mut self.buf[start..]
    }

    /// The complete wire image (header + payload).
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Current cursor offset, counted from the start of the header.
    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Move the cursor back to the first payload byte.
    pub fn rewind(&mut self) -> &mut Self {
        self.cursor = HEADER_SIZE;
        self
    }

    // ------------------------------------------------------------------------
    // Buffer management
    // ------------------------------------------------------------------------

    /// Resize the buffer to `new_size` bytes (header included).
    ///
    /// Existing bytes up to `min(old, new)` are kept, new bytes are zero.
    /// The length field is updated to match and the cursor is clamped.
    pub fn realloc(&mut self, new_size: usize) -> Result<&mut Self> {
        self.ensure_buffer()?;
        if new_size < HEADER_SIZE {
            return Err(PacketError::BelowHeader(new_size));
        }
        check_payload_len(new_size - HEADER_SIZE)?;
        if new_size > self.buf.len() {
            let additional = new_size - self.buf.len();
            self.buf
                .try_reserve_exact(additional)
                .map_err(|_| PacketError::AllocationFailed(additional))?;
        }
        self.buf.resize(new_size, 0);
        self.cursor = self.cursor.min(new_size);
        self.sync_length();
        Ok(self)
    }

    /// Take over the buffer of `other`, dropping this packet's own buffer.
    ///
    /// `other` is left without a buffer: it reports `is_valid() == false`,
    /// type `NULL` and zero lengths, and every append fails with
    /// [`PacketError::Invalid`].
    pub fn transfer_data(&mut self, other: &mut Packet) -> &mut Self {
        self.buf = std::mem::take(&mut other.buf);
        self.cursor = if self.buf.len() >= HEADER_SIZE {
            self.cursor.clamp(HEADER_SIZE, self.buf.len())
        } else {
            0
        };
        other.cursor = 0;
        self
    }

    // ------------------------------------------------------------------------
    // Appending
    // ------------------------------------------------------------------------

    /// Append a fixed-width value at the cursor.
    ///
    /// Writing happens at the cursor, not at the end: anything after the
    /// cursor is dropped and the payload ends right behind the new value.
    /// On failure the buffer is left untouched.
    pub fn append<T: Scalar>(&mut self, value: T) -> Result<&mut Self> {
        let slot = self.grow_at_cursor(T::WIDTH)?;
        value.write_to(slot);
        Ok(self)
    }

    /// Append a string followed by a single `0` terminator.
    ///
    /// An embedded `0` byte would end the string early on the reading side.
    pub fn append_str(&mut self, s: &str) -> Result<&mut Self> {
        let bytes = s.as_bytes();
        let slot = self.grow_at_cursor(bytes.len() + 1)?;
        slot[..bytes.len()].copy_from_slice(bytes);
        slot[bytes.len()] = 0;
        Ok(self)
    }

    /// Append raw bytes.
    ///
    /// `None` stands for an absent source and writes a single `0` byte,
    /// i.e. an empty string.
    pub fn append_raw(&mut self, data: Option<&[u8]>) -> Result<&mut Self> {
        match data {
            Some(bytes) => {
                let slot = self.grow_at_cursor(bytes.len())?;
                slot.copy_from_slice(bytes);
            }
            None => {
                let slot = self.grow_at_cursor(1)?;
                slot[0] = 0;
            }
        }
        Ok(self)
    }

    // ------------------------------------------------------------------------
    // Reading
    // ------------------------------------------------------------------------

    /// Read a fixed-width value at the cursor.
    ///
    /// Fails without moving the cursor if fewer than `T::WIDTH` bytes remain.
    pub fn try_get<T: Scalar>(&mut self) -> Result<T> {
        let bytes = self.take(T::WIDTH)?;
        Ok(T::read_from(bytes))
    }

    /// Read a fixed-width value, returning zero if it runs past the end.
    ///
    /// This is the forgiving variant existing peers rely on; the cursor
    /// does not move when the read fails.
    pub fn get<T: Scalar>(&mut self) -> T {
        self.try_get().unwrap_or_else(|_| T::zero())
    }

    /// Read a terminated string at the cursor.
    ///
    /// On success the cursor lands right behind the terminator. Fails
    /// without moving the cursor if no terminator is found.
    pub fn try_get_string(&mut self) -> Result<String> {
        if self.cursor >= self.buf.len() {
            return Err(PacketError::OutOfBounds {
                needed: 1,
                available: 0,
            });
        }
        let len = self.find_terminator().ok_or(PacketError::Unterminated)?;
        let s = String::from_utf8_lossy(&self.buf[self.cursor..self.cursor + len]).into_owned();
        self.cursor += len + 1;
        Ok(s)
    }

    /// Read a terminated string, forgiving variant.
    ///
    /// If the cursor is already at the end, returns an empty string. If no
    /// terminator exists the buffer is treated as corrupt: the cursor moves
    /// to the end and an empty string is returned.
    pub fn get_string(&mut self) -> String {
        match self.try_get_string() {
            Ok(s) => s,
            Err(PacketError::Unterminated) => {
                self.cursor = self.buf.len();
                String::new()
            }
            Err(_) => String::new(),
        }
    }

    /// Read up to `len` raw bytes at the cursor, clamped to the end.
    ///
    /// `len == 0` reads everything that is left.
    pub fn get_raw(&mut self, len: usize) -> Vec<u8> {
        if self.cursor >= self.buf.len() {
            return Vec::new();
        }
        let available = self.remaining();
        let n = if len == 0 { available } else { len.min(available) };
        let start = self.cursor;
        self.cursor += n;
        self.buf[start..start + n].to_vec()
    }

    /// Remove the string at the cursor from the buffer and return it.
    ///
    /// The string bytes and their terminator are cut out, the payload
    /// shrinks accordingly and the cursor stays at the same absolute offset,
    /// now pointing at whatever followed. Without a terminator everything
    /// from the cursor to the end is removed and returned.
    pub fn extract_string(&mut self) -> String {
        if self.cursor >= self.buf.len() {
            return String::new();
        }
        let (len, removed) = match self.find_terminator() {
            Some(len) => (len, len + 1),
            None => {
                let len = self.buf.len() - self.cursor;
                (len, len)
            }
        };
        let bytes: Vec<u8> = self.buf.drain(self.cursor..self.cursor + removed).collect();
        self.sync_length();
        String::from_utf8_lossy(&bytes[..len]).into_owned()
    }

    // ------------------------------------------------------------------------
    // Nesting
    // ------------------------------------------------------------------------

    /// Append this packet to `container` as a nested record.
    ///
    /// The record is `(type: u8, payload_len: u32, payload)`, without magic.
    pub fn write_to_packet(&self, container: &mut Packet) -> Result<()> {
        self.ensure_buffer()?;
        container
            .append(self.request_type())?
            .append(self.payload_len() as u32)?
            .append_raw(Some(self.payload()))?;
        Ok(())
    }

    /// Replace this packet with a nested record read from `container`.
    ///
    /// The new buffer gets fresh magic bytes and the cursor is rewound. If
    /// the record is truncated, both packets are left unchanged.
    pub fn read_from_packet(&mut self, container: &mut Packet) -> Result<()> {
        let start = container.cursor;
        let parsed = (|| {
            let request_type: RequestType = container.try_get()?;
            let len: u32 = container.try_get()?;
            let payload = container.take(len as usize)?;
            Packet::from_parts(request_type, payload)
        })();

        match parsed {
            Ok(packet) => {
                *self = packet;
                Ok(())
            }
            Err(e) => {
                container.cursor = start;
                Err(e)
            }
        }
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn ensure_buffer(&self) -> Result<()> {
        if self.buf.len() < HEADER_SIZE {
            return Err(PacketError::Invalid);
        }
        Ok(())
    }

    fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.cursor)
    }

    /// Offset of the next `0` byte relative to the cursor.
    fn find_terminator(&self) -> Option<usize> {
        self.buf[self.cursor..].iter().position(|&b| b == 0)
    }

    /// Consume exactly `n` bytes at the cursor.
    fn take(&mut self, n: usize) -> Result<&[u8]> {
        let available = self.remaining();
        if n > available {
            return Err(PacketError::OutOfBounds {
                needed: n,
                available,
            });
        }
        if n == 0 {
            return Ok(&[]);
        }
        let start = self.cursor;
        self.cursor += n;
        Ok(&self.buf[start..start + n])
    }

    /// Cut the buffer at the cursor and extend it by `n` zero bytes.
    ///
    /// Returns the new slot; the cursor is already advanced past it.
    fn grow_at_cursor(&mut self, n: usize) -> Result<&mut [u8]> {
        self.ensure_buffer()?;
        let start = self.cursor;
        let new_len = start.checked_add(n).ok_or(PacketError::TooLarge(usize::MAX))?;
        check_payload_len(new_len - HEADER_SIZE)?;
        if new_len > self.buf.len() {
            self.buf
                .try_reserve(new_len - self.buf.len())
                .map_err(|_| PacketError::AllocationFailed(n))?;
        }
        self.buf.truncate(start);
        self.buf.resize(new_len, 0);
        self.cursor = new_len;
        self.sync_length();
        Ok(&mut self.buf[start..new_len])
    }

    /// Write the payload length into the header field.
    fn sync_length(&mut self) {
        let len = self.payload_len() as u32;
        self.buf[LENGTH_OFFSET..HEADER_SIZE].copy_from_slice(&len.to_ne_bytes());
    }
}

fn check_payload_len(len: usize) -> Result<()> {
    if len > u32::MAX as usize {
        return Err(PacketError::TooLarge(len));
    }
    Ok(())
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("request_type", &self.request_type())
            .field("payload_len", &self.payload_len())
            .field("cursor", &self.cursor)
            .field("valid", &self.is_valid())
            .finish()
    }
}
