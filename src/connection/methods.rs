//! # Server operations.
//!
//! [`ConnectionMethods`] is the seam to the HTTP (or any other) API that negotiates channel
//! tokens and registers server-side interest. The runtime calls it from spawned tasks:
//!
//! ```text
//! open_connection ──► connect(subscriber)          ──► ChannelToken ──► Transport::open
//! bind            ──► bind(subscriber, event)      (fire-and-forget, reported on the bus)
//! unbind          ──► unbind(subscriber, event)    (fire-and-forget, reported on the bus)
//! keep-alive tick ──► keep_alive(subscriber)       (fire-and-forget, never retried)
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ChannelError;
use crate::identity::Subscriber;

/// One-time credential returned by [`ConnectionMethods::connect`].
///
/// Consumed by value when the transport is opened; the runtime does not keep it.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ChannelToken(String);

impl ChannelToken {
    /// Wraps a raw token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Unwraps the raw token.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

// Tokens are credentials: keep them out of debug output.
impl fmt::Debug for ChannelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ChannelToken(..)")
    }
}

impl From<&str> for ChannelToken {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl From<String> for ChannelToken {
    fn from(token: String) -> Self {
        Self::new(token)
    }
}

/// # Server operations used by the push runtime.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use pushvisor::{ChannelError, ChannelToken, ConnectionMethods, Subscriber};
///
/// struct Api;
///
/// #[async_trait]
/// impl ConnectionMethods for Api {
///     async fn connect(&self, subscriber: &Subscriber) -> Result<ChannelToken, ChannelError> {
///         Ok(ChannelToken::new(format!("token-for-{subscriber}")))
///     }
///     async fn bind(&self, _: &Subscriber, _: &str) -> Result<(), ChannelError> { Ok(()) }
///     async fn unbind(&self, _: &Subscriber, _: &str) -> Result<(), ChannelError> { Ok(()) }
///     async fn keep_alive(&self, _: &Subscriber) -> Result<(), ChannelError> { Ok(()) }
/// }
/// ```
#[async_trait]
pub trait ConnectionMethods: Send + Sync + 'static {
    /// Negotiates a channel for `subscriber` and returns its token.
    async fn connect(&self, subscriber: &Subscriber) -> Result<ChannelToken, ChannelError>;

    /// Registers server-side interest of `subscriber` in `event`.
    async fn bind(&self, subscriber: &Subscriber, event: &str) -> Result<(), ChannelError>;

    /// Withdraws server-side interest of `subscriber` in `event`.
    async fn unbind(&self, subscriber: &Subscriber, event: &str) -> Result<(), ChannelError>;

    /// Signals that the channel of `subscriber` is still in use.
    async fn keep_alive(&self, subscriber: &Subscriber) -> Result<(), ChannelError>;
}

/// Shared handle to a [`ConnectionMethods`] implementation.
pub type MethodsRef = Arc<dyn ConnectionMethods>;
