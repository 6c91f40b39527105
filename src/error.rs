//! Error types used by the push channel runtime and its collaborators.
//!
//! This module defines two enums:
//!
//! - [`ChannelError`]: failures of the injected server operations and the transport.
//! - [`MessageError`]: inbound payloads that cannot be decoded into a [`PushMessage`](crate::PushMessage).
//!
//! Neither is ever returned from the public [`PushManager`](crate::PushManager) API: the driver
//! recovers from channel errors on its own and drops malformed messages. Both surface only
//! through [`Event::reason`](crate::Event::reason) and in embedders' own
//! [`ConnectionMethods`](crate::ConnectionMethods) implementations.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by server calls and transports.
///
/// Embedders return these from [`ConnectionMethods`](crate::ConnectionMethods) and
/// [`Transport`](crate::Transport). The runtime decides what to do with them:
/// connect failures arm the reconnect timer, transport failures trigger an immediate
/// reconnect, everything else is reported and forgotten.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The server answered but refused the request.
    #[error("rejected by server: {error}")]
    Rejected {
        /// The underlying error message.
        error: String,
    },

    /// The server or channel could not be reached.
    #[error("unavailable: {error}")]
    Unavailable {
        /// The underlying error message.
        error: String,
    },

    /// The call did not complete within the configured call timeout.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout that was exceeded.
        timeout: Duration,
    },

    /// The channel was closed by the remote side.
    #[error("channel closed")]
    Closed,
}

impl ChannelError {
    /// Shorthand for [`ChannelError::Rejected`].
    pub fn rejected(error: impl Into<String>) -> Self {
        ChannelError::Rejected {
            error: error.into(),
        }
    }

    /// Shorthand for [`ChannelError::Unavailable`].
    pub fn unavailable(error: impl Into<String>) -> Self {
        ChannelError::Unavailable {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use pushvisor::ChannelError;
    /// use std::time::Duration;
    ///
    /// let err = ChannelError::Timeout { timeout: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "channel_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ChannelError::Rejected { .. } => "channel_rejected",
            ChannelError::Unavailable { .. } => "channel_unavailable",
            ChannelError::Timeout { .. } => "channel_timeout",
            ChannelError::Closed => "channel_closed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ChannelError::Rejected { error } => format!("rejected: {error}"),
            ChannelError::Unavailable { error } => format!("unavailable: {error}"),
            ChannelError::Timeout { timeout } => format!("timeout: {timeout:?}"),
            ChannelError::Closed => "channel closed".to_string(),
        }
    }

    /// Indicates whether repeating the same call may succeed.
    ///
    /// Returns `true` for [`ChannelError::Unavailable`], [`ChannelError::Timeout`]
    /// and [`ChannelError::Closed`]; `false` for [`ChannelError::Rejected`].
    ///
    /// The lifecycle driver retries connects regardless; this is a hint for
    /// embedders layering their own retries on bind/unbind.
    ///
    /// # Example
    /// ```
    /// use pushvisor::ChannelError;
    ///
    /// assert!(ChannelError::unavailable("dns").is_retryable());
    /// assert!(!ChannelError::rejected("forbidden").is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ChannelError::Rejected { .. })
    }
}

/// # Errors produced while decoding an inbound channel message.
///
/// The dispatcher drops such messages; they are reported as
/// [`EventKind::MessageDropped`](crate::EventKind::MessageDropped).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum MessageError {
    /// The payload is not valid JSON.
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload is JSON but not an object.
    #[error("payload is not a json object")]
    NotAnObject,

    /// The object has no string `event` field.
    #[error("payload has no string `event` field")]
    MissingEvent,
}

impl MessageError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            MessageError::Json(_) => "message_invalid_json",
            MessageError::NotAnObject => "message_not_object",
            MessageError::MissingEvent => "message_missing_event",
        }
    }
}
