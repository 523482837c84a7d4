//! Non-blocking TCP connect with an overall deadline.
//!
//! The connect runs as a small state machine on a non-blocking socket:
//!
//! ```text
//! resolve ──fail──► HostName
//!    │
//!    ▼
//! connect() ──ok / EISCONN──────────────────────► connected
//!    │ EINPROGRESS
//!    ├──────────► wait writable ──timeout──────► Socket
//!    │                 │ ready
//!    │                 ▼
//!    │            SO_ERROR ──0 / EISCONN───────► connected
//!    │                 └────other──────────────► Socket
//!    │ EALREADY / EAGAIN / EINTR
//!    ├──────────► retry until deadline ─expired─► Timeout
//!    │ other
//!    └──────────────────────────────────────────► NotConnected
//! ```

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout_at, Instant};

use crate::config::ConnectionConfig;
use crate::error::{ConnectionError, Result};

/// How a single `connect()` attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    Connected,
    InProgress,
    Retry,
    Failed,
}

/// Resolve `name` and connect to it within `config.max_wait`.
pub(crate) async fn connect(
    name: &str,
    port: u16,
    config: &ConnectionConfig,
) -> Result<(TcpStream, SocketAddr)> {
    let deadline = config.max_wait.deadline_from(Instant::now());
    let addr = resolve(name, port, deadline).await?;

    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
        .map_err(ConnectionError::Socket)?;
    socket.set_nonblocking(true).map_err(ConnectionError::Socket)?;
    let target = addr.into();

    let retry_interval = config.connect_retry_interval;
    let attempt = attempt_until(|| socket.connect(&target), deadline, retry_interval)
        .await
        .map_err(|e| {
            tracing::error!(host = name, port, error = %e, "Connect failed");
            e
        })?;

    let stream = into_tokio(socket)?;
    if attempt == Attempt::InProgress {
        wait_established(stream.writable(), || stream.take_error(), deadline).await?;
    }
    tracing::debug!(%addr, "Connected");
    Ok((stream, addr))
}

/// Repeat `attempt` until it connects, starts a handshake or fails for good.
///
/// Returns [`Attempt::Connected`] or [`Attempt::InProgress`].
async fn attempt_until<F>(
    mut attempt: F,
    deadline: Option<Instant>,
    retry_interval: Duration,
) -> Result<Attempt>
where
    F: FnMut() -> io::Result<()>,
{
    loop {
        match attempt() {
            Ok(()) => return Ok(Attempt::Connected),
            Err(e) => match classify(&e) {
                Attempt::Failed => {
                    tracing::debug!(error = %e, "connect() failed");
                    return Err(ConnectionError::NotConnected);
                }
                Attempt::Retry => {}
                done => return Ok(done),
            },
        }

        if deadline.is_some_and(|d| Instant::now() >= d) {
            tracing::debug!("Connect timed out (maybe the counterpart is down)");
            return Err(ConnectionError::Timeout);
        }
        sleep(retry_interval).await;
    }
}

/// Resolve to the first address of `name`.
async fn resolve(name: &str, port: u16, deadline: Option<Instant>) -> Result<SocketAddr> {
    let host_error = |reason: String| ConnectionError::HostName {
        host: name.to_string(),
        reason,
    };

    let lookup = tokio::net::lookup_host((name, port));
    let result = match deadline {
        Some(d) => timeout_at(d, lookup)
            .await
            .map_err(|_| host_error("resolution timed out".to_string()))?,
        None => lookup.await,
    };

    let mut addrs = result.map_err(|e| {
        tracing::error!(host = name, error = %e, "Could not resolve host");
        host_error(e.to_string())
    })?;
    addrs.next().ok_or_else(|| host_error("no address found".to_string()))
}

/// Wait for an in-progress connect to finish, then check its outcome.
///
/// `ready` resolves once the socket is writable; `take_error` reads the
/// pending socket error afterwards.
async fn wait_established<R, E>(ready: R, take_error: E, deadline: Option<Instant>) -> Result<()>
where
    R: Future<Output = io::Result<()>>,
    E: FnOnce() -> io::Result<Option<io::Error>>,
{
    let ready = match deadline {
        Some(d) => match timeout_at(d, ready).await {
            Ok(r) => r,
            Err(_) => {
                return Err(ConnectionError::Socket(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "connection not established in time",
                )));
            }
        },
        None => ready.await,
    };
    ready.map_err(ConnectionError::Select)?;

    match take_error() {
        Ok(None) => Ok(()),
        Ok(Some(e)) if classify(&e) == Attempt::Connected => Ok(()),
        Ok(Some(e)) | Err(e) => {
            tracing::error!(error = %e, "Connect failed");
            Err(ConnectionError::Socket(e))
        }
    }
}

fn into_tokio(socket: Socket) -> Result<TcpStream> {
    let std_stream: std::net::TcpStream = socket.into();
    TcpStream::from_std(std_stream).map_err(ConnectionError::Socket)
}

fn classify(err: &io::Error) -> Attempt {
    #[cfg(unix)]
    if let Some(code) = err.raw_os_error() {
        return match code {
            libc::EISCONN => Attempt::Connected,
            libc::EINPROGRESS => Attempt::InProgress,
            c if c == libc::EALREADY || c == libc::EAGAIN || c == libc::EWOULDBLOCK => {
                Attempt::Retry
            }
            libc::EINTR => Attempt::Retry,
            _ => Attempt::Failed,
        };
    }

    match err.kind() {
        // Windows reports an in-progress connect as WSAEWOULDBLOCK.
        io::ErrorKind::WouldBlock => Attempt::InProgress,
        io::ErrorKind::Interrupted => Attempt::Retry,
        _ => Attempt::Failed,
    }
}
