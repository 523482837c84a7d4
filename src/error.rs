//! Error types for ftss-net.
//!
//! Two layers of errors exist:
//! - [`PacketError`] for buffer/cursor operations on a single [`Packet`](crate::Packet)
//! - [`ConnectionError`] for everything that touches a socket
//!
//! Every connection-level failure also has a legacy numeric code
//! (see [`ConnectionError::code`]) matching the values existing peers log.

use thiserror::Error;

use crate::protocol::RequestType;

/// Errors raised by packet buffer operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    /// A read would extend past the end of the buffer.
    #[error("read of {needed} bytes exceeds the {available} bytes left in the packet")]
    OutOfBounds { needed: usize, available: usize },

    /// No terminator byte was found between the cursor and the buffer end.
    #[error("string at cursor is not terminated")]
    Unterminated,

    /// The payload would no longer fit the 32-bit length field.
    #[error("payload of {0} bytes does not fit the header length field")]
    TooLarge(usize),

    /// The buffer could not be grown.
    #[error("could not grow packet buffer by {0} bytes")]
    AllocationFailed(usize),

    /// A resize would cut into the fixed header.
    #[error("buffer size {0} is smaller than the packet header")]
    BelowHeader(usize),

    /// The packet's buffer was moved away (see `Packet::transfer_data`).
    #[error("packet holds no buffer")]
    Invalid,
}

/// Main error type for all connection operations.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The connection is not connected.
    #[error("not connected")]
    NotConnected,

    /// Socket error while sending.
    #[error("send failed: {0}")]
    Send(#[source] std::io::Error),

    /// Waiting for socket readiness failed.
    #[error("polling the socket failed: {0}")]
    Select(#[source] std::io::Error),

    /// The operation did not complete within the allowed wait.
    #[error("timed out")]
    Timeout,

    /// Socket error or connection loss while receiving.
    #[error("receive failed: {0}")]
    Receive(String),

    /// The response type does not match the request type.
    #[error("wrong response: expected {expected}, received {received}")]
    WrongResponse {
        expected: RequestType,
        received: RequestType,
    },

    /// The request type is a sentinel and cannot be sent as a request.
    #[error("invalid request type {0}")]
    WrongRequest(RequestType),

    /// Host name resolution failed.
    #[error("could not resolve host {host}: {reason}")]
    HostName { host: String, reason: String },

    /// Low-level socket/OS error.
    #[error("socket error: {0}")]
    Socket(#[source] std::io::Error),

    /// A method argument was invalid.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ConnectionError {
    /// Legacy numeric code of this error (`0` is reserved for success).
    pub fn code(&self) -> i32 {
        match self {
            ConnectionError::NotConnected => -1,
            ConnectionError::Send(_) => -2,
            ConnectionError::Select(_) => -3,
            ConnectionError::Timeout => -4,
            ConnectionError::Receive(_) => -5,
            ConnectionError::WrongResponse { .. } => -6,
            ConnectionError::WrongRequest(_) => -7,
            ConnectionError::HostName { .. } => -8,
            ConnectionError::Socket(_) => -9,
            ConnectionError::InvalidInput(_) => -10,
        }
    }
}

impl From<PacketError> for ConnectionError {
    fn from(err: PacketError) -> Self {
        ConnectionError::InvalidInput(err.to_string())
    }
}

/// Result type alias using ConnectionError.
pub type Result<T, E = ConnectionError> = std::result::Result<T, E>;
