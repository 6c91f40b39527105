//! # Observable connection status.
//!
//! The driver publishes a [`ConnectionStatus`] snapshot through a `tokio::sync::watch`
//! channel after every step that changes it.
//!
//! ```text
//!            open_connection                 connect ok
//!   Idle ─────────────────────► Connecting ─────────────────► Connected
//!                                 ▲    │ connect failed            │ transport error
//!                      timer fired│    ▼                           │ (immediate retry)
//!                             ReconnectPending ◄───────────────────-┘ (if that retry fails)
//! ```

use crate::identity::Subscriber;

/// Lifecycle state of a push manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No connect attempted yet, or the manager was shut down.
    #[default]
    Idle,
    /// A connect call is in flight.
    Connecting,
    /// Transport open, keep-alive running.
    Connected,
    /// Connect failed; the reconnect timer is armed.
    ReconnectPending,
}

/// Snapshot of the lifecycle state and the active subscriber.
///
/// `subscriber` is the subscriber whose connect last succeeded; it may differ from the
/// subscriber of an attempt that is still `Connecting` or `ReconnectPending`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectionStatus {
    /// Current lifecycle state.
    pub state: ConnectionState,
    /// Active subscriber, if any connect has succeeded.
    pub subscriber: Option<Subscriber>,
}

impl ConnectionStatus {
    /// Whether the lifecycle is in [`ConnectionState::Connected`].
    ///
    /// While a new connect is `Connecting`, the previous transport may still be open and
    /// sending keep-alives; this still returns `false`.
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}
