//! Per-connection tunables.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use ftss_net::{ConnectionConfig, MaxWait};
//!
//! let config = ConnectionConfig::default()
//!     .with_max_wait(MaxWait::Bounded(Duration::from_millis(250)))
//!     .with_queue_capacity(8);
//! assert_eq!(config.queue_capacity, 8);
//! ```

use std::time::Duration;

use tokio::time::Instant;

use crate::protocol::DEFAULT_MAX_PAYLOAD_LEN;

/// Default max wait for connect, receive and `mreq` (1 second).
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_millis(1000);

/// Default bound of the out-of-order packet queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// Default wait used by `get_received_packet_if_any`.
pub const DEFAULT_PRESENT_POLL: Duration = Duration::from_millis(10);

/// Default back-off between retryable connect attempts.
pub const DEFAULT_CONNECT_RETRY_INTERVAL: Duration = Duration::from_millis(1);

/// Upper bound on blocking waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxWait {
    /// Give up after this long.
    Bounded(Duration),
    /// Wait with no bound.
    Infinite,
}

impl MaxWait {
    /// Build from milliseconds; `u64::MAX` is the infinite sentinel.
    pub fn from_millis(ms: u64) -> Self {
        if ms == u64::MAX {
            MaxWait::Infinite
        } else {
            MaxWait::Bounded(Duration::from_millis(ms))
        }
    }

    /// The bound, `None` when infinite.
    #[inline]
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            MaxWait::Bounded(d) => Some(*d),
            MaxWait::Infinite => None,
        }
    }

    /// Deadline counted from `start`, `None` when infinite.
    pub fn deadline_from(&self, start: Instant) -> Option<Instant> {
        self.as_duration().and_then(|d| start.checked_add(d))
    }
}

impl Default for MaxWait {
    fn default() -> Self {
        MaxWait::Bounded(DEFAULT_MAX_WAIT)
    }
}

impl From<Duration> for MaxWait {
    fn from(d: Duration) -> Self {
        MaxWait::Bounded(d)
    }
}

/// Configuration of a single connection.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Bound on connect, on each low-level receive and on `mreq`.
    pub max_wait: MaxWait,
    /// Maximum number of queued out-of-order packets.
    pub queue_capacity: usize,
    /// Wait used when peeking for a packet that may already be present.
    pub present_poll: Duration,
    /// Sleep between retryable connect attempts.
    pub connect_retry_interval: Duration,
    /// Frames claiming a larger payload are discarded as malformed.
    pub max_payload_len: u32,
}

impl ConnectionConfig {
    /// Default config with `max_wait` set from milliseconds.
    ///
    /// `u64::MAX` means wait forever.
    pub fn from_millis(ms: u64) -> Self {
        Self::default().with_max_wait(MaxWait::from_millis(ms))
    }

    /// Set the max wait.
    pub fn with_max_wait(mut self, max_wait: MaxWait) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Set the queue bound. Values below 1 are raised to 1.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Set the short wait of `get_received_packet_if_any`.
    pub fn with_present_poll(mut self, wait: Duration) -> Self {
        self.present_poll = wait;
        self
    }

    /// Set the connect retry back-off.
    pub fn with_connect_retry_interval(mut self, interval: Duration) -> Self {
        self.connect_retry_interval = interval;
        self
    }

    /// Set the largest accepted payload.
    pub fn with_max_payload_len(mut self, len: u32) -> Self {
        self.max_payload_len = len;
        self
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_wait: MaxWait::default(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            present_poll: DEFAULT_PRESENT_POLL,
            connect_retry_interval: DEFAULT_CONNECT_RETRY_INTERVAL,
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
        }
    }
}
