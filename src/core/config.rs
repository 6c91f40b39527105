//! # Push manager configuration.
//!
//! Provides [`Config`], the immutable settings handed to
//! [`PushManager::builder`](crate::PushManager::builder). Nothing can be changed after the
//! manager is built.
//!
//! ## Sentinel values
//! - `keep_alive_interval = 0s` → keep-alive disabled
//! - `call_timeout = 0s` → server calls are never timed out
//! - `subscriber_id_length = 0` → treated as 1
//! - `bus_capacity = 0` → treated as 1
//! - `reconnect` with a zero delay (`with_reconnect_seconds(0)`) → retry immediately;
//!   a connect that keeps failing is then retried without pause

use std::time::Duration;

use crate::identity::DEFAULT_ID_LENGTH;
use crate::policies::ReconnectPolicy;

/// Configuration for the push channel runtime.
///
/// ## Field semantics
/// - `keep_alive_interval`: period of keep-alive calls while connected (`0s` = disabled)
/// - `reconnect`: delay policy after a failed connect
/// - `subscriber_id_length`: length of generated subscriber identifiers
/// - `call_timeout`: per-call timeout for server operations (`0s` = none)
/// - `bus_capacity`: event bus ring buffer size
/// - `notify_bulk_unbind`: send `unbind` to the server when all handlers of an event are removed
#[derive(Clone, Debug)]
pub struct Config {
    /// Period between keep-alive calls while connected.
    pub keep_alive_interval: Duration,

    /// Delay policy for retrying a failed connect with the same subscriber.
    pub reconnect: ReconnectPolicy,

    /// Number of symbols in generated subscriber identifiers.
    pub subscriber_id_length: usize,

    /// Timeout applied to each connect/bind/unbind/keep-alive call and transport open.
    pub call_timeout: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,

    /// Whether `unbind(event, None)` notifies the server.
    ///
    /// Off by default: removing all handlers of an event only drops them locally, and only
    /// single-handler removal is announced to the server.
    pub notify_bulk_unbind: bool,
}

impl Config {
    /// Sets the keep-alive period in seconds.
    #[must_use]
    pub fn with_keep_alive_seconds(mut self, secs: u64) -> Self {
        self.keep_alive_interval = Duration::from_secs(secs);
        self
    }

    /// Sets a constant, jitter-free reconnect delay in seconds. `0` retries immediately.
    #[must_use]
    pub fn with_reconnect_seconds(mut self, secs: u64) -> Self {
        self.reconnect = ReconnectPolicy::fixed(Duration::from_secs(secs));
        self
    }

    /// Sets a constant, jitter-free reconnect delay.
    #[must_use]
    pub fn with_reconnect_interval(mut self, delay: Duration) -> Self {
        self.reconnect = ReconnectPolicy::fixed(delay);
        self
    }

    /// Sets the generated subscriber identifier length.
    #[must_use]
    pub fn with_subscriber_id_length(mut self, len: usize) -> Self {
        self.subscriber_id_length = len;
        self
    }

    /// Returns the keep-alive period, `None` when disabled.
    #[inline]
    pub fn keep_alive_period(&self) -> Option<Duration> {
        if self.keep_alive_interval == Duration::ZERO {
            None
        } else {
            Some(self.keep_alive_interval)
        }
    }

    /// Returns the server call timeout, `None` when disabled.
    #[inline]
    pub fn call_timeout(&self) -> Option<Duration> {
        if self.call_timeout == Duration::ZERO {
            None
        } else {
            Some(self.call_timeout)
        }
    }

    /// Returns the identifier length clamped to a minimum of 1.
    #[inline]
    pub fn subscriber_id_length_clamped(&self) -> usize {
        self.subscriber_id_length.max(1)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `keep_alive_interval = 60s`
    /// - `reconnect = ReconnectPolicy::default()` (5–10s, jittered)
    /// - `subscriber_id_length = 15`
    /// - `call_timeout = 30s`
    /// - `bus_capacity = 1024`
    /// - `notify_bulk_unbind = false`
    fn default() -> Self {
        Self {
            keep_alive_interval: Duration::from_secs(60),
            reconnect: ReconnectPolicy::default(),
            subscriber_id_length: DEFAULT_ID_LENGTH,
            call_timeout: Duration::from_secs(30),
            bus_capacity: 1024,
            notify_bulk_unbind: false,
        }
    }
}
