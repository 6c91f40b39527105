//! # Channel transport.
//!
//! [`Transport::open`] turns a [`ChannelToken`] into a [`TransportStream`]: a single
//! tagged-variant stream carrying inbound messages and transport errors, consumed by the
//! lifecycle driver one item at a time.
//!
//! ```text
//! socket ──► TransportEvent::Message(text) ──► driver ──► dispatcher ──► handlers
//!        └─► TransportEvent::Error(reason) ──► driver ──► reconnect
//! stream end (None)                        ──► treated as an error ("closed")
//! ```
//!
//! Dropping the stream closes the channel; the driver holds at most one at a time.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::stream::{BoxStream, Stream, StreamExt};
use tokio::sync::mpsc;

use super::ChannelToken;
use crate::error::ChannelError;

/// Item delivered by an open transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Raw inbound payload (JSON text).
    Message(String),
    /// The transport failed; the channel must be reopened.
    Error(String),
}

/// Stream of [`TransportEvent`]s for one open channel.
pub struct TransportStream {
    inner: BoxStream<'static, TransportEvent>,
}

impl TransportStream {
    /// Wraps any stream of transport events.
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = TransportEvent> + Send + 'static,
    {
        Self {
            inner: stream.boxed(),
        }
    }

    /// Builds a stream fed by an mpsc channel; the stream ends when all senders are dropped.
    pub fn from_receiver(rx: mpsc::Receiver<TransportEvent>) -> Self {
        Self::new(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|ev| (ev, rx))
        }))
    }

    /// Receives the next event, `None` once the channel has ended.
    pub async fn next_event(&mut self) -> Option<TransportEvent> {
        self.inner.next().await
    }
}

impl Stream for TransportStream {
    type Item = TransportEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl fmt::Debug for TransportStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportStream").finish_non_exhaustive()
    }
}

/// Opens duplex channels from tokens.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Opens the channel identified by `token`.
    async fn open(&self, token: ChannelToken) -> Result<TransportStream, ChannelError>;
}

/// Shared handle to a [`Transport`] implementation.
pub type TransportRef = Arc<dyn Transport>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn receiver_backed_stream_preserves_order_and_ends() {
        let (tx, rx) = mpsc::channel(8);
        let mut stream = TransportStream::from_receiver(rx);

        tx.send(TransportEvent::Message("one".into())).await.unwrap();
        tx.send(TransportEvent::Error("boom".into())).await.unwrap();
        drop(tx);

        assert_eq!(
            stream.next_event().await,
            Some(TransportEvent::Message("one".into()))
        );
        assert_eq!(
            stream.next_event().await,
            Some(TransportEvent::Error("boom".into()))
        );
        assert_eq!(stream.next_event().await, None);
    }

    #[tokio::test]
    async fn dropping_stream_closes_sender_side() {
        let (tx, rx) = mpsc::channel::<TransportEvent>(1);
        let stream = TransportStream::from_receiver(rx);
        assert!(!tx.is_closed());
        drop(stream);
        assert!(tx.is_closed());
    }
}
