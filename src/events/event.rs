//! # Runtime events emitted by the push channel driver.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Lifecycle events**: connect attempts, reconnect scheduling, transport failures
//! - **Server call events**: bind/unbind/keep-alive notifications and their failures
//! - **Dispatch events**: dropped, unhandled or panicking messages
//! - **Runtime events**: subscriber overflow/panic and shutdown
//!
//! The [`Event`] struct carries metadata such as timestamps, the subscriber, the push
//! event name, reasons and reconnect delays.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use pushvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ReconnectScheduled)
//!     .with_subscriber("client-1")
//!     .with_reason("unavailable: dns")
//!     .with_attempt(3)
//!     .with_delay(Duration::from_secs(5));
//!
//! assert_eq!(ev.kind, EventKind::ReconnectScheduled);
//! assert_eq!(ev.subscriber.as_deref(), Some("client-1"));
//! assert_eq!(ev.delay_ms, Some(5_000));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Lifecycle events ===
    /// A connect attempt started.
    ///
    /// Sets:
    /// - `subscriber`: subscriber being connected
    /// - `attempt`: generation of this attempt
    ConnectStarting,

    /// Connect succeeded and the transport is open.
    ///
    /// Sets:
    /// - `subscriber`: the now active subscriber
    /// - `attempt`: generation of the attempt
    Connected,

    /// Connect call or transport open failed.
    ///
    /// Sets:
    /// - `subscriber`: subscriber that failed to connect
    /// - `reason`: failure message
    ConnectFailed,

    /// A connect outcome arrived for an attempt that was replaced by a newer one.
    ///
    /// Sets:
    /// - `subscriber`: subscriber of the stale attempt
    /// - `attempt`: stale generation
    ConnectSuperseded,

    /// Reconnect timer armed after a failed connect.
    ///
    /// Sets:
    /// - `subscriber`: subscriber to retry with
    /// - `attempt`: consecutive failure count
    /// - `delay_ms`: delay before the retry (ms)
    /// - `reason`: last failure message
    ReconnectScheduled,

    /// The open transport reported an error or ended.
    ///
    /// Sets:
    /// - `subscriber`: active subscriber
    /// - `reason`: transport error
    TransportFailed,

    // === Server call events ===
    /// Keep-alive sent for the active subscriber.
    KeepAliveSent,

    /// Keep-alive call failed (not retried).
    ///
    /// Sets:
    /// - `reason`: failure message
    KeepAliveFailed,

    /// Bind notification acknowledged by the server.
    ///
    /// Sets:
    /// - `subscriber`, `event_name`
    BindSent,

    /// Bind notification failed.
    ///
    /// Sets:
    /// - `subscriber`, `event_name`, `reason`
    BindFailed,

    /// Unbind notification acknowledged by the server.
    ///
    /// Sets:
    /// - `subscriber`, `event_name`
    UnbindSent,

    /// Unbind notification failed.
    ///
    /// Sets:
    /// - `subscriber`, `event_name`, `reason`
    UnbindFailed,

    /// A bind/unbind notification was not sent because no subscriber is active.
    ///
    /// Sets:
    /// - `event_name`, `reason`
    NotifySkipped,

    /// All handlers of an event were removed at once.
    ///
    /// Sets:
    /// - `event_name`
    /// - `reason`: whether the server was notified
    HandlersCleared,

    // === Dispatch events ===
    /// Inbound payload could not be decoded and was dropped.
    ///
    /// Sets:
    /// - `reason`: decode error
    MessageDropped,

    /// Inbound message had no registered handlers.
    ///
    /// Sets:
    /// - `event_name`
    MessageUnhandled,

    /// A handler panicked while processing a message.
    ///
    /// Sets:
    /// - `event_name`, `reason`: panic info
    HandlerPanicked,

    // === Runtime events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `reason`: subscriber name and panic info
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `reason`: subscriber name and reason ("full", "closed")
    SubscriberOverflow,

    /// Shutdown requested through [`PushManager::shutdown`](crate::PushManager::shutdown).
    ShutdownRequested,

    /// The driver stopped; the transport is closed and in-flight calls are aborted.
    Stopped,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Subscriber the event refers to, if any.
    pub subscriber: Option<Arc<str>>,
    /// Push event name (registry key), if any.
    pub event_name: Option<Arc<str>>,
    /// Human-readable reason (errors, panic info, etc.).
    pub reason: Option<Arc<str>>,
    /// Reconnect delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Attempt or generation number.
    pub attempt: Option<u64>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            subscriber: None,
            event_name: None,
            reason: None,
            delay_ms: None,
            attempt: None,
        }
    }

    /// Attaches a subscriber.
    #[inline]
    pub fn with_subscriber(mut self, subscriber: impl AsRef<str>) -> Self {
        self.subscriber = Some(Arc::from(subscriber.as_ref()));
        self
    }

    /// Attaches a push event name.
    #[inline]
    pub fn with_event_name(mut self, name: impl AsRef<str>) -> Self {
        self.event_name = Some(Arc::from(name.as_ref()));
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a reconnect delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches an attempt or generation number.
    #[inline]
    pub fn with_attempt(mut self, n: u64) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} info={info}"))
    }

    /// Returns the reconnect delay as a [`Duration`], if set.
    pub fn delay(&self) -> Option<Duration> {
        self.delay_ms.map(|ms| Duration::from_millis(u64::from(ms)))
    }

    /// Whether this event reports a failure of some kind.
    pub fn is_failure(&self) -> bool {
        matches!(
            self.kind,
            EventKind::ConnectFailed
                | EventKind::TransportFailed
                | EventKind::KeepAliveFailed
                | EventKind::BindFailed
                | EventKind::UnbindFailed
                | EventKind::MessageDropped
                | EventKind::HandlerPanicked
                | EventKind::SubscriberPanicked
                | EventKind::SubscriberOverflow
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic() {
        let a = Event::new(EventKind::ConnectStarting);
        let b = Event::new(EventKind::Connected);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn delay_is_clamped_to_u32_millis() {
        let ev = Event::new(EventKind::ReconnectScheduled).with_delay(Duration::from_secs(u64::MAX));
        assert_eq!(ev.delay_ms, Some(u32::MAX));
        let ev = Event::new(EventKind::ReconnectScheduled).with_delay(Duration::from_millis(7_500));
        assert_eq!(ev.delay(), Some(Duration::from_millis(7_500)));
    }

    #[test]
    fn failure_classification() {
        assert!(Event::new(EventKind::ConnectFailed).is_failure());
        assert!(Event::subscriber_overflow("log", "full").is_failure());
        assert!(!Event::new(EventKind::KeepAliveSent).is_failure());
    }
}
