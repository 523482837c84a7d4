//! # ftss-net
//!
//! Transport and framing layer of the FTSS packet protocol.
//!
//! Peers exchange typed, length-prefixed packets over a stream socket.
//! Every packet starts with a 9-byte header:
//!
//! ```text
//! ┌──────────┬──────────┬──────────┬─────────────────┐
//! │ "FTSS"   │ Type     │ Length   │ Payload         │
//! │ 4 bytes  │ 1 byte   │ 4 bytes  │ Length bytes    │
//! └──────────┴──────────┴──────────┴─────────────────┘
//! ```
//!
//! ## Architecture
//!
//! - **Packet** ([`protocol`]): owned buffer with a cursor for typed
//!   append/get and nested records
//! - **Connection** ([`connection`]): the transport-independent contract,
//!   the out-of-order packet queue and traffic statistics
//! - **Transport** ([`transport`]): TCP connect with deadline, framing with
//!   resynchronization, request/response correlation, listener
//!
//! ## Example
//!
//! ```ignore
//! use ftss_net::{Connection, ConnectionConfig, Packet, RequestType, TcpConnection};
//!
//! #[tokio::main]
//! async fn main() -> ftss_net::Result<()> {
//!     let mut conn = TcpConnection::connect("localhost", 0xAF75, ConnectionConfig::default()).await?;
//!
//!     let mut packet = Packet::new(RequestType::LOGIN);
//!     packet.append_str("user")?.append_str("secret")?;
//!     conn.mreq(&mut packet).await?;
//!
//!     println!("login result: {}", packet.get::<i8>());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod transport;

pub use config::{ConnectionConfig, MaxWait};
pub use connection::{Connection, ConnectionStats, PacketQueue, TrafficCounts};
pub use error::{ConnectionError, PacketError, Result};
pub use protocol::{Packet, RequestType};
pub use transport::{ConnectionState, ConnectionWaiter, TcpConnection, TransportConnection};
