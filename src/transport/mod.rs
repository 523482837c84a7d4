//! Transport module - socket-backed connections.
//!
//! Provides:
//! - Non-blocking TCP connect bounded by a deadline
//! - [`TransportConnection`], the stream-backed [`Connection`](crate::Connection)
//! - [`ConnectionWaiter`], the accepting side

mod connect;
mod connection;
mod listener;

pub use connection::{ConnectionState, TcpConnection, TransportConnection};
pub use listener::{ConnectionCallback, ConnectionWaiter};
