//! Accepting side: wait for incoming connections and hand them off.
//!
//! # Example
//!
//! ```ignore
//! use ftss_net::{ConnectionWaiter, MaxWait};
//!
//! let mut waiter = ConnectionWaiter::bind(0xAF75, |conn| {
//!     tokio::spawn(serve(conn));
//! })
//! .await?;
//!
//! while !shutdown_requested() {
//!     waiter.wait_for_then_do_connection(MaxWait::default()).await;
//! }
//! ```

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::time::{sleep, timeout_at, Instant};

use super::TcpConnection;
use crate::config::{ConnectionConfig, MaxWait};
use crate::connection::Connection;
use crate::error::{ConnectionError, Result};

/// Back-off after a failed `accept()`.
const ACCEPT_RETRY_INTERVAL: Duration = Duration::from_millis(1);

/// Receives every accepted connection.
pub type ConnectionCallback = Box<dyn FnMut(Box<dyn Connection>) + Send>;

/// A listening socket that wraps each accepted client in a connection.
pub struct ConnectionWaiter {
    listener: TcpListener,
    callback: ConnectionCallback,
    /// Config given to accepted connections.
    config: ConnectionConfig,
}

impl ConnectionWaiter {
    /// Listen on `port` on all IPv4 interfaces.
    pub async fn bind<F>(port: u16, callback: F) -> Result<Self>
    where
        F: FnMut(Box<dyn Connection>) + Send + 'static,
    {
        Self::bind_addr(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)), callback).await
    }

    /// Listen on a specific address.
    pub async fn bind_addr<F>(addr: SocketAddr, callback: F) -> Result<Self>
    where
        F: FnMut(Box<dyn Connection>) + Send + 'static,
    {
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!(%addr, error = %e, "Could not listen");
            ConnectionError::Socket(e)
        })?;
        tracing::debug!(%addr, "Listening");

        Ok(Self {
            listener,
            callback: Box::new(callback),
            config: ConnectionConfig::default(),
        })
    }

    /// Use `config` for connections accepted from now on.
    pub fn with_connection_config(mut self, config: ConnectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().map_err(ConnectionError::Socket)
    }

    /// Wait up to `max_wait` for one client.
    ///
    /// Returns `true` once a client was accepted and handed to the
    /// callback, `false` if none came in time. Failed accepts are logged
    /// and waiting continues.
    pub async fn wait_for_then_do_connection(&mut self, max_wait: MaxWait) -> bool {
        let deadline = max_wait.deadline_from(Instant::now());

        loop {
            let accept = self.listener.accept();
            let result = match deadline {
                Some(d) => match timeout_at(d, accept).await {
                    Ok(r) => r,
                    Err(_) => return false,
                },
                None => accept.await,
            };

            match result {
                Ok((stream, peer)) => {
                    tracing::debug!(%peer, "Accepted connection");
                    let conn = TcpConnection::accepted(stream, peer, self.config.clone());
                    (self.callback)(Box::new(conn));
                    return true;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Accept failed");
                    sleep(ACCEPT_RETRY_INTERVAL).await;
                }
            }
        }
    }
}
