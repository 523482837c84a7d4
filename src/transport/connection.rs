//! Stream-backed connection: framing, timeouts, queueing and `mreq`.
//!
//! # Receive path
//!
//! ```text
//! queue? ──hit──────────────────────────────► packet
//!   │ miss
//!   ▼
//! wait readable ──timeout──────────────────► None
//!   │
//!   ▼
//! scan "FTSS" byte by byte (MagicScanner)
//!   │
//!   ▼
//! read type + length ──len 0 / too large──► discard, None
//!   │
//!   ▼
//! read payload ──invalid header──────────► discard, None
//!   │
//!   ▼
//! count received ─────────────────────────► packet
//! ```
//!
//! Every low-level read is bounded by the max wait, counted from the start
//! of that read call. A frame assembled from several reads can therefore
//! take a multiple of the max wait.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::{timeout, timeout_at, Instant};

use super::connect;
use crate::config::{ConnectionConfig, MaxWait};
use crate::connection::{Connection, ConnectionStats, PacketQueue};
use crate::error::{ConnectionError, Result};
use crate::protocol::{MagicScanner, Packet, PacketHeader, RequestType, ScanStep, HEADER_SIZE, MAGIC};

/// Outcome of one receive attempt.
enum Incoming {
    Packet(Packet),
    /// A malformed frame was read and dropped.
    Discarded,
    /// Nothing arrived in time, or the connection broke.
    Idle,
}

/// Lifecycle state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// A [`Connection`] over any byte stream.
///
/// Use [`TcpConnection`] for sockets. Any `AsyncRead + AsyncWrite` stream
/// works, e.g. `tokio::io::duplex` in tests.
#[derive(Debug)]
pub struct TransportConnection<S> {
    /// `None` while disconnected.
    stream: Option<BufReader<S>>,
    peer: Option<SocketAddr>,
    state: ConnectionState,
    config: ConnectionConfig,
    queue: PacketQueue,
    stats: ConnectionStats,
}

/// A connection over TCP.
pub type TcpConnection = TransportConnection<TcpStream>;

// ============================================================================
// Construction
// ============================================================================

impl TcpConnection {
    /// Resolve `name` and connect to it as a client.
    ///
    /// The whole sequence is bounded by `config.max_wait`.
    pub async fn connect(name: &str, port: u16, config: ConnectionConfig) -> Result<Self> {
        let mut conn = Self::unconnected(config);
        conn.reconnect(name, port).await?;
        Ok(conn)
    }

    /// Wrap a socket returned by `accept()`.
    pub fn accepted(stream: TcpStream, peer: SocketAddr, config: ConnectionConfig) -> Self {
        Self::from_stream(stream, Some(peer), config)
    }

    /// Drop the current connection, if any, and connect again.
    ///
    /// Queued packets of the old connection are dropped; statistics are kept.
    pub async fn reconnect(&mut self, name: &str, port: u16) -> Result<()> {
        if self.is_connected() {
            self.disconnect();
        }

        self.state = ConnectionState::Connecting;
        match connect::connect(name, port, &self.config).await {
            Ok((stream, addr)) => {
                self.stream = Some(BufReader::new(stream));
                self.peer = Some(addr);
                self.state = ConnectionState::Connected;
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Disconnected;
                Err(e)
            }
        }
    }
}

impl<S> TransportConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an already open stream. The connection starts out connected.
    pub fn from_stream(stream: S, peer: Option<SocketAddr>, config: ConnectionConfig) -> Self {
        tracing::debug!(peer = ?peer, "Wrapping accepted connection");
        Self {
            stream: Some(BufReader::new(stream)),
            peer,
            state: ConnectionState::Connected,
            queue: PacketQueue::new(config.queue_capacity),
            stats: ConnectionStats::new(),
            config,
        }
    }

    /// A connection with no stream yet.
    pub fn unconnected(config: ConnectionConfig) -> Self {
        Self {
            stream: None,
            peer: None,
            state: ConnectionState::Disconnected,
            queue: PacketQueue::new(config.queue_capacity),
            stats: ConnectionStats::new(),
            config,
        }
    }

    #[inline]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    #[inline]
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    // ========================================================================
    // Low-level I/O
    // ========================================================================

    /// Fill `buf` completely from the stream.
    ///
    /// Partial reads are accumulated. Returns [`ConnectionError::Timeout`]
    /// if `buf` is not full within the max wait (the bytes read so far are
    /// lost; the connection stays up). A closed stream or a hard error
    /// disconnects and returns [`ConnectionError::Receive`].
    pub async fn read_lowlevel(&mut self, buf: &mut [u8]) -> Result<()> {
        let deadline = self.config.max_wait.deadline_from(Instant::now());
        let mut filled = 0;

        while filled < buf.len() {
            let stream = self.stream_mut()?;
            let read = stream.read(&mut buf[filled..]);
            let result = match deadline {
                Some(d) => match timeout_at(d, read).await {
                    Ok(r) => r,
                    Err(_) => {
                        tracing::debug!(
                            wanted = buf.len(),
                            got = filled,
                            "Dropping partial read due to timeout"
                        );
                        return Err(ConnectionError::Timeout);
                    }
                },
                None => read.await,
            };

            match result {
                Ok(0) => {
                    self.drop_stream("connection closed by counterpart");
                    return Err(ConnectionError::Receive(
                        "connection closed by counterpart".to_string(),
                    ));
                }
                Ok(n) => filled += n,
                Err(e) if is_transient(&e) => continue,
                Err(e) => {
                    self.drop_stream("receive failed");
                    return Err(ConnectionError::Receive(e.to_string()));
                }
            }
        }

        tracing::trace!(len = buf.len(), "recv");
        Ok(())
    }

    /// Write all of `data` to the stream.
    ///
    /// Partial writes are continued until everything is written. Any hard
    /// error disconnects and returns [`ConnectionError::Send`].
    pub async fn send_raw(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream_mut()?;
        let mut written = 0;

        let outcome = loop {
            if written == data.len() {
                break stream.flush().await;
            }
            match stream.write(&data[written..]).await {
                Ok(0) => {
                    break Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "stream accepted no bytes",
                    ))
                }
                Ok(n) => written += n,
                Err(e) if is_transient(&e) => continue,
                Err(e) => break Err(e),
            }
        };

        if let Err(e) = outcome {
            tracing::error!(error = %e, written, len = data.len(), "Send failed");
            self.drop_stream("send failed");
            return Err(ConnectionError::Send(e));
        }

        tracing::trace!(len = data.len(), "send");
        Ok(())
    }

    /// Read bytes until they end with `terminator`.
    ///
    /// The terminator is part of the returned line. If the stream times out
    /// or closes first, whatever was read so far is returned.
    pub async fn get_line(&mut self, terminator: &str) -> String {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];

        while self.read_lowlevel(&mut byte).await.is_ok() {
            line.push(byte[0]);
            if line.ends_with(terminator.as_bytes()) {
                break;
            }
        }

        String::from_utf8_lossy(&line).into_owned()
    }

    // ========================================================================
    // Framing
    // ========================================================================

    /// Receive one packet, waiting at most `wait` for it to start arriving.
    async fn get_packet(&mut self, use_queue: bool, wait: MaxWait) -> Option<Packet> {
        match self.receive(use_queue, wait).await {
            Incoming::Packet(packet) => Some(packet),
            Incoming::Discarded | Incoming::Idle => None,
        }
    }

    async fn receive(&mut self, use_queue: bool, wait: MaxWait) -> Incoming {
        if use_queue {
            if let Some(packet) = self.queue.pop_first(RequestType::NONE) {
                return Incoming::Packet(packet);
            }
        }

        match self.wait_readable(wait).await {
            Ok(true) => {}
            Ok(false) => return Incoming::Idle,
            Err(e) => {
                tracing::debug!(error = %e, "No packet");
                return Incoming::Idle;
            }
        }

        match self.read_frame().await {
            Ok(Some(packet)) => {
                self.stats.record_received(packet.request_type());
                tracing::debug!(
                    request_type = %packet.request_type(),
                    payload_len = packet.payload_len(),
                    "Received packet"
                );
                Incoming::Packet(packet)
            }
            Ok(None) => {
                self.stats.record_discarded();
                Incoming::Discarded
            }
            Err(e) => {
                tracing::debug!(error = %e, "Receive aborted");
                Incoming::Idle
            }
        }
    }

    /// Wait until at least one byte is readable.
    ///
    /// `Ok(false)` if nothing arrived within `wait`.
    async fn wait_readable(&mut self, wait: MaxWait) -> Result<bool> {
        let stream = self.stream_mut()?;
        let fill = stream.fill_buf();
        let result = match wait.as_duration() {
            Some(d) => match timeout(d, fill).await {
                Ok(r) => r.map(|buffered| buffered.len()),
                Err(_) => return Ok(false),
            },
            None => fill.await.map(|buffered| buffered.len()),
        };

        match result {
            Ok(0) => {
                self.drop_stream("connection closed by counterpart");
                Err(ConnectionError::Receive(
                    "connection closed by counterpart".to_string(),
                ))
            }
            Ok(_) => Ok(true),
            Err(e) if is_transient(&e) => Ok(false),
            Err(e) => {
                self.drop_stream("poll failed");
                Err(ConnectionError::Select(e))
            }
        }
    }

    /// Read the next frame.
    ///
    /// `Ok(None)` if a malformed frame was read and discarded.
    async fn read_frame(&mut self) -> Result<Option<Packet>> {
        let mut scanner = MagicScanner::new();
        let mut byte = [0u8; 1];
        loop {
            self.read_lowlevel(&mut byte).await?;
            if scanner.feed(byte[0]) == ScanStep::Synced {
                break;
            }
        }
        if scanner.discarded() > 0 {
            tracing::warn!(
                discarded = scanner.discarded(),
                "Skipped bytes before frame start"
            );
        }

        let mut raw = [0u8; HEADER_SIZE];
        raw[..MAGIC.len()].copy_from_slice(&MAGIC);
        self.read_lowlevel(&mut raw[MAGIC.len()..]).await?;
        let Some(header) = PacketHeader::decode(&raw) else {
            return Ok(None);
        };

        if header.payload_len == 0 {
            tracing::warn!(
                request_type = %header.request_type,
                "Discarding frame with empty payload"
            );
            return Ok(None);
        }
        if header.payload_len > self.config.max_payload_len {
            tracing::warn!(
                request_type = %header.request_type,
                payload_len = header.payload_len,
                max = self.config.max_payload_len,
                "Discarding frame with oversized payload"
            );
            return Ok(None);
        }

        let mut packet = Packet::new(header.request_type);
        if let Err(e) = packet.realloc(header.frame_len()) {
            tracing::warn!(error = %e, "Discarding frame");
            return Ok(None);
        }
        self.read_lowlevel(packet.payload_mut()).await?;

        if !packet.is_valid() {
            tracing::warn!(
                request_type = %header.request_type,
                "Discarding frame with invalid header"
            );
            return Ok(None);
        }
        Ok(Some(packet))
    }

    /// Wait for a packet of `request_type`, queueing everything else.
    async fn get_packet_with_type(
        &mut self,
        request_type: RequestType,
        wait: MaxWait,
    ) -> Option<Packet> {
        if request_type == RequestType::NONE || request_type > RequestType::MAX {
            tracing::warn!(%request_type, "Refusing to wait for a sentinel type");
            return None;
        }
        if let Some(packet) = self.queue.pop_first(request_type) {
            return Some(packet);
        }

        loop {
            let packet = self.get_packet(false, wait).await?;
            if packet.request_type() == request_type {
                return Some(packet);
            }
            self.queue.push(packet);
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn stream_mut(&mut self) -> Result<&mut BufReader<S>> {
        self.stream.as_mut().ok_or(ConnectionError::NotConnected)
    }

    /// Error for an `mreq` that ran out of time or lost its connection.
    fn no_response(&self, expected: RequestType, unrelated: Option<RequestType>) -> ConnectionError {
        match unrelated {
            Some(received) if self.is_connected() => {
                tracing::error!(%expected, %received, "Wrong response");
                ConnectionError::WrongResponse { expected, received }
            }
            _ => {
                tracing::error!(%expected, "No response received");
                ConnectionError::Receive(format!("no response of type {expected}"))
            }
        }
    }

    /// Tear down after a fatal socket error.
    fn drop_stream(&mut self, reason: &str) {
        tracing::error!(peer = ?self.peer, reason, "Connection lost");
        self.disconnect();
    }
}

fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
    )
}

/// Time left until `deadline` as a wait bound.
fn remaining(deadline: Option<Instant>) -> MaxWait {
    match deadline {
        Some(d) => MaxWait::Bounded(d.saturating_duration_since(Instant::now())),
        None => MaxWait::Infinite,
    }
}

// ============================================================================
// Connection
// ============================================================================

#[async_trait]
impl<S> Connection for TransportConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected && self.stream.is_some()
    }

    fn disconnect(&mut self) {
        if self.stream.take().is_some() {
            tracing::debug!(peer = ?self.peer, "Disconnected");
        }
        self.state = ConnectionState::Disconnected;

        let dropped = self.queue.clear();
        if dropped > 0 {
            tracing::debug!(dropped, "Dropped packets still left in the queue");
        }
    }

    fn counterpart_address(&self) -> Option<SocketAddr> {
        self.peer
    }

    async fn send(&mut self, packet: &Packet) -> Result<()> {
        if packet.header().is_none() {
            return Err(ConnectionError::InvalidInput(
                "packet holds no buffer".to_string(),
            ));
        }

        self.send_raw(packet.as_bytes()).await?;
        self.stats.record_sent(packet.request_type());
        tracing::debug!(
            request_type = %packet.request_type(),
            payload_len = packet.payload_len(),
            "Sent packet"
        );
        Ok(())
    }

    async fn wait_for_then_get_packet(&mut self, use_queue: bool) -> Option<Packet> {
        let wait = self.config.max_wait;
        self.get_packet(use_queue, wait).await
    }

    async fn get_packet_if_present(&mut self, use_queue: bool) -> Option<Packet> {
        self.get_packet(use_queue, MaxWait::Bounded(Duration::ZERO))
            .await
    }

    async fn get_received_packet_if_any(&mut self) -> Option<Packet> {
        if let Some(packet) = self.queue.pop_first(RequestType::NONE) {
            return Some(packet);
        }
        let wait = MaxWait::Bounded(self.config.present_poll);
        self.get_packet(false, wait).await
    }

    async fn wait_for_then_get_packet_with_type(
        &mut self,
        request_type: RequestType,
    ) -> Option<Packet> {
        let wait = self.config.max_wait;
        self.get_packet_with_type(request_type, wait).await
    }

    async fn get_packet_with_type_if_present(
        &mut self,
        request_type: RequestType,
    ) -> Option<Packet> {
        self.get_packet_with_type(request_type, MaxWait::Bounded(Duration::ZERO))
            .await
    }

    async fn mreq(&mut self, packet: &mut Packet) -> Result<()> {
        if !self.is_connected() {
            return Err(ConnectionError::NotConnected);
        }
        let expected = packet.request_type();
        if !expected.is_request() {
            return Err(ConnectionError::WrongRequest(expected));
        }

        self.send(packet).await?;
        let deadline = self.config.max_wait.deadline_from(Instant::now());

        let mut unrelated = None;
        let mut response = match self.queue.pop_first(expected) {
            Some(queued) => queued,
            None => loop {
                match self.receive(false, remaining(deadline)).await {
                    Incoming::Packet(received) if received.request_type() == expected => {
                        break received;
                    }
                    Incoming::Packet(received) => {
                        tracing::debug!(
                            %expected,
                            received = %received.request_type(),
                            "Queueing unrelated packet while waiting for response"
                        );
                        unrelated = Some(received.request_type());
                        self.queue.push(received);
                    }
                    Incoming::Discarded => {}
                    Incoming::Idle => return Err(self.no_response(expected, unrelated)),
                }

                if deadline.is_some_and(|d| Instant::now() >= d) {
                    return Err(self.no_response(expected, unrelated));
                }
            },
        };

        tracing::debug!(
            request_type = %expected,
            payload_len = response.payload_len(),
            "Accepted response"
        );
        packet.transfer_data(&mut response);
        packet.rewind();
        Ok(())
    }

    fn set_max_wait(&mut self, max_wait: MaxWait) {
        self.config.max_wait = max_wait;
    }

    fn max_wait(&self) -> MaxWait {
        self.config.max_wait
    }

    fn stats(&self) -> &ConnectionStats {
        &self.stats
    }

    fn queue(&self) -> &PacketQueue {
        &self.queue
    }

    fn queue_mut(&mut self) -> &mut PacketQueue {
        &mut self.queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, DuplexStream};

    fn config(max_wait_ms: u64) -> ConnectionConfig {
        ConnectionConfig::from_millis(max_wait_ms)
    }

    fn pair(config: ConnectionConfig) -> (TransportConnection<DuplexStream>, DuplexStream) {
        let (local, remote) = duplex(4096);
        (TransportConnection::from_stream(local, None, config), remote)
    }

    fn frame(request_type: RequestType, payload: &[u8]) -> Vec<u8> {
        Packet::from_parts(request_type, payload)
            .unwrap()
            .as_bytes()
            .to_vec()
    }

    fn raw_header(request_type: u8, payload_len: u32) -> Vec<u8> {
        PacketHeader::new(RequestType(request_type), payload_len)
            .encode()
            .to_vec()
    }

    #[tokio::test]
    async fn test_send_writes_wire_image() {
        let (mut conn, mut remote) = pair(config(1000));
        let mut packet = Packet::new(RequestType::LOGIN);
        packet.append(1234i32).unwrap().append_str("Hello").unwrap();

        conn.send(&packet).await.unwrap();

        let mut wire = vec![0u8; packet.total_len()];
        remote.read_exact(&mut wire).await.unwrap();
        assert_eq!(wire, packet.as_bytes());
        assert_eq!(conn.stats().get(RequestType::LOGIN).unwrap().sent, 1);
    }

    #[tokio::test]
    async fn test_receive_packet() {
        let (mut conn, mut remote) = pair(config(1000));
        remote.write_all(&frame(RequestType::GAME_INFO, b"map\0")).await.unwrap();

        let mut packet = conn.wait_for_then_get_packet(false).await.unwrap();

        assert_eq!(packet.request_type(), RequestType::GAME_INFO);
        assert_eq!(packet.get_string(), "map");
        assert_eq!(conn.stats().get(RequestType::GAME_INFO).unwrap().received, 1);
    }

    #[tokio::test]
    async fn test_read_lowlevel_one_byte_chunks() {
        // A one-byte pipe hands out at most one byte per read.
        let (local, mut remote) = duplex(1);
        let mut conn = TransportConnection::from_stream(local, None, config(1000));
        let data: Vec<u8> = (0..=255u8).collect();

        let expected = data.clone();
        let writer = tokio::spawn(async move {
            for b in data {
                remote.write_all(&[b]).await.unwrap();
            }
            remote
        });

        let mut buf = vec![0u8; 256];
        conn.read_lowlevel(&mut buf).await.unwrap();
        assert_eq!(buf, expected);
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_packet_from_one_byte_chunks() {
        let (local, mut remote) = duplex(1);
        let mut conn = TransportConnection::from_stream(local, None, config(1000));
        let wire = frame(RequestType::CHAT_SENDMSG, b"hello world\0");

        let writer = tokio::spawn(async move {
            for b in wire {
                remote.write_all(&[b]).await.unwrap();
            }
            remote
        });

        let mut packet = conn.wait_for_then_get_packet(false).await.unwrap();
        assert_eq!(packet.get_string(), "hello world");
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_read_lowlevel_timeout_keeps_connection() {
        let (mut conn, mut remote) = pair(config(50));
        remote.write_all(b"ab").await.unwrap();

        let mut buf = [0u8; 4];
        let err = conn.read_lowlevel(&mut buf).await.unwrap_err();

        assert!(matches!(err, ConnectionError::Timeout));
        assert!(conn.is_connected());
    }

    #[tokio::test]
    async fn test_resync_over_garbage() {
        let (mut conn, mut remote) = pair(config(1000));
        let mut wire = b"\x00xxFTSFT\x01FFTS".to_vec();
        wire.extend(frame(RequestType::LOGOUT, &[7]));
        remote.write_all(&wire).await.unwrap();

        let mut packet = conn.wait_for_then_get_packet(false).await.unwrap();

        assert_eq!(packet.request_type(), RequestType::LOGOUT);
        assert_eq!(packet.get::<u8>(), 7);
        assert_eq!(conn.stats().discarded_frames(), 0);
    }

    #[tokio::test]
    async fn test_zero_length_frame_is_discarded() {
        let (mut conn, mut remote) = pair(config(1000));
        let mut wire = raw_header(RequestType::LOGIN.0, 0);
        wire.extend(frame(RequestType::LOGIN, &[1]));
        remote.write_all(&wire).await.unwrap();

        assert!(conn.wait_for_then_get_packet(false).await.is_none());
        assert_eq!(conn.stats().discarded_frames(), 1);
        assert!(conn.is_connected());

        let packet = conn.wait_for_then_get_packet(false).await.unwrap();
        assert_eq!(packet.payload(), &[1]);
        assert!(conn.stats().get(RequestType::LOGIN).is_some());
    }

    #[tokio::test]
    async fn test_invalid_type_is_discarded() {
        let (mut conn, mut remote) = pair(config(1000));
        let mut wire = raw_header(0x50, 2);
        wire.extend_from_slice(&[9, 9]);
        wire.extend(frame(RequestType::GAME_LST, &[2]));
        remote.write_all(&wire).await.unwrap();

        assert!(conn.wait_for_then_get_packet(false).await.is_none());
        assert_eq!(conn.stats().discarded_frames(), 1);
        assert!(conn.stats().get(RequestType(0x50)).is_none());

        let packet = conn.wait_for_then_get_packet(false).await.unwrap();
        assert_eq!(packet.request_type(), RequestType::GAME_LST);
    }

    #[tokio::test]
    async fn test_oversized_frame_is_discarded() {
        let (mut conn, mut remote) = pair(config(1000).with_max_payload_len(8));
        let mut wire = raw_header(RequestType::LOGIN.0, 16);
        wire.extend_from_slice(&[0u8; 16]);
        wire.extend(frame(RequestType::LOGIN, b"ok\0"));
        remote.write_all(&wire).await.unwrap();

        assert!(conn.wait_for_then_get_packet(false).await.is_none());

        let mut packet = conn.wait_for_then_get_packet(false).await.unwrap();
        assert_eq!(packet.get_string(), "ok");
    }

    #[tokio::test]
    async fn test_nothing_arrives() {
        let (mut conn, _remote) = pair(config(50));

        assert!(conn.wait_for_then_get_packet(true).await.is_none());
        assert!(conn.get_packet_if_present(true).await.is_none());
        assert!(conn.is_connected());
    }

    #[tokio::test]
    async fn test_peer_close_disconnects() {
        let (mut conn, remote) = pair(config(1000));
        conn.queue_packet(Packet::new(RequestType::LOGIN));
        drop(remote);

        assert!(conn.wait_for_then_get_packet(false).await.is_none());
        assert!(!conn.is_connected());
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert!(conn.queue().is_empty());
    }

    #[tokio::test]
    async fn test_queue_is_served_first() {
        let (mut conn, mut remote) = pair(config(1000));
        remote.write_all(&frame(RequestType::GAME_LST, &[1])).await.unwrap();
        conn.queue_packet(Packet::from_parts(RequestType::LOGIN, &[2]).unwrap());

        let first = conn.wait_for_then_get_packet(true).await.unwrap();
        assert_eq!(first.request_type(), RequestType::LOGIN);

        let second = conn.wait_for_then_get_packet(true).await.unwrap();
        assert_eq!(second.request_type(), RequestType::GAME_LST);
    }

    #[tokio::test]
    async fn test_get_line() {
        let (mut conn, mut remote) = pair(config(50));
        remote.write_all(b"HTTP/1.1 200 OK\r\nrest").await.unwrap();

        assert_eq!(conn.get_line("\r\n").await, "HTTP/1.1 200 OK\r\n");
        assert_eq!(conn.get_line("\r\n").await, "rest");
        assert!(conn.is_connected());
    }

    #[tokio::test]
    async fn test_send_when_disconnected() {
        let (mut conn, _remote) = pair(config(1000));
        conn.disconnect();

        let err = conn.send(&Packet::new(RequestType::LOGIN)).await.unwrap_err();
        assert!(matches!(err, ConnectionError::NotConnected));
        assert!(conn.wait_for_then_get_packet(false).await.is_none());
    }

    #[tokio::test]
    async fn test_send_transferred_packet_is_invalid_input() {
        let (mut conn, _remote) = pair(config(1000));
        let mut source = Packet::new(RequestType::LOGIN);
        let mut target = Packet::new(RequestType::LOGIN);
        target.transfer_data(&mut source);

        let err = conn.send(&source).await.unwrap_err();
        assert!(matches!(err, ConnectionError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_mreq_with_interleaved_replies() {
        let (mut conn, mut remote) = pair(config(1000));

        let server = tokio::spawn(async move {
            let mut request = vec![0u8; HEADER_SIZE + 4];
            remote.read_exact(&mut request).await.unwrap();
            assert_eq!(request[4], RequestType::LOGIN.0);

            remote.write_all(&frame(RequestType::GAME_LST, &[1])).await.unwrap();
            remote.write_all(&frame(RequestType::CHAT_GETMSG, &[2])).await.unwrap();
            remote
                .write_all(&frame(RequestType::LOGIN, &7i32.to_ne_bytes()))
                .await
                .unwrap();
            remote
        });

        let mut packet = Packet::new(RequestType::LOGIN);
        packet.append(99u32).unwrap();
        conn.mreq(&mut packet).await.unwrap();

        assert_eq!(packet.request_type(), RequestType::LOGIN);
        assert_eq!(packet.get::<i32>(), 7);

        let first = conn.get_received_packet_if_any().await.unwrap();
        assert_eq!(first.request_type(), RequestType::GAME_LST);
        let second = conn.get_received_packet_if_any().await.unwrap();
        assert_eq!(second.request_type(), RequestType::CHAT_GETMSG);

        let stats = conn.stats();
        assert_eq!(stats.get(RequestType::LOGIN).unwrap().sent, 1);
        assert_eq!(stats.get(RequestType::LOGIN).unwrap().received, 1);
        assert_eq!(stats.get(RequestType::GAME_LST).unwrap().received, 1);

        let _remote = server.await.unwrap();
    }

    #[tokio::test]
    async fn test_mreq_uses_queued_response() {
        let (mut conn, _remote) = pair(config(1000));
        conn.queue_packet(Packet::from_parts(RequestType::GAME_LST, &[1]).unwrap());
        conn.queue_packet(Packet::from_parts(RequestType::GAME_INFO, &[5]).unwrap());

        let mut packet = Packet::new(RequestType::GAME_INFO);
        conn.mreq(&mut packet).await.unwrap();

        assert_eq!(packet.get::<u8>(), 5);
        assert_eq!(conn.queue().len(), 1);
    }

    #[tokio::test]
    async fn test_mreq_rejects_sentinels() {
        let (mut conn, _remote) = pair(config(1000));

        for request_type in [RequestType::NULL, RequestType::NONE, RequestType::MAX] {
            let mut packet = Packet::new(request_type);
            let err = conn.mreq(&mut packet).await.unwrap_err();
            assert!(matches!(err, ConnectionError::WrongRequest(t) if t == request_type));
        }

        conn.disconnect();
        let err = conn.mreq(&mut Packet::new(RequestType::LOGIN)).await.unwrap_err();
        assert!(matches!(err, ConnectionError::NotConnected));
    }

    #[tokio::test]
    async fn test_mreq_without_response() {
        let (mut conn, _remote) = pair(config(50));
        let mut packet = Packet::new(RequestType::LOGIN);
        packet.append(1u8).unwrap();

        let err = conn.mreq(&mut packet).await.unwrap_err();

        assert!(matches!(err, ConnectionError::Receive(_)));
        assert_eq!(err.code(), -5);
        // The request is left as it was sent.
        assert_eq!(packet.payload(), &[1]);
    }

    #[tokio::test]
    async fn test_mreq_wrong_response() {
        let (mut conn, mut remote) = pair(config(100));

        let server = tokio::spawn(async move {
            let unrelated = frame(RequestType::GAME_LST, &[0]);
            while remote.write_all(&unrelated).await.is_ok() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        });

        let err = conn
            .mreq(&mut Packet::from_parts(RequestType::LOGIN, &[1]).unwrap())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ConnectionError::WrongResponse {
                expected: RequestType::LOGIN,
                received: RequestType::GAME_LST,
            }
        ));
        assert!(!conn.queue().is_empty());

        drop(conn);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_for_type_queues_others() {
        let (mut conn, mut remote) = pair(config(1000));
        remote.write_all(&frame(RequestType::CHAT_JOIN, &[1])).await.unwrap();
        remote.write_all(&frame(RequestType::CHAT_LIST, &[2])).await.unwrap();

        let packet = conn
            .wait_for_then_get_packet_with_type(RequestType::CHAT_LIST)
            .await
            .unwrap();
        assert_eq!(packet.payload(), &[2]);
        assert_eq!(conn.queue().len(), 1);

        let queued = conn
            .get_packet_with_type_if_present(RequestType::CHAT_JOIN)
            .await
            .unwrap();
        assert_eq!(queued.payload(), &[1]);
    }

    #[tokio::test]
    async fn test_wait_for_type_rejects_sentinels() {
        let (mut conn, _remote) = pair(config(1000));

        assert!(conn
            .wait_for_then_get_packet_with_type(RequestType::NONE)
            .await
            .is_none());
        assert!(conn
            .wait_for_then_get_packet_with_type(RequestType(0x45))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_set_max_wait() {
        let (mut conn, _remote) = pair(config(1000));
        conn.set_max_wait(MaxWait::Infinite);
        assert_eq!(conn.max_wait(), MaxWait::Infinite);
    }
}
