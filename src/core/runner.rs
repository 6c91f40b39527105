//! # Run a single server call.
//!
//! Executes one injected operation with the configured timeout and reports the outcome on
//! the [`Bus`]. Connect attempts return their result to the driver; bind, unbind and
//! keep-alive calls are fire-and-forget.
//!
//! ## Event flow
//! ```text
//! Bind      → Ok  → BindSent        Err → BindFailed
//! Unbind    → Ok  → UnbindSent      Err → UnbindFailed
//! KeepAlive → Ok  → KeepAliveSent   Err → KeepAliveFailed   (never retried)
//! Connect   → connect() → token → Transport::open(token) → stream | error (to the driver)
//! ```
//!
//! ## Rules
//! - Every call is wrapped in `tokio::time::timeout` when a call timeout is configured.
//! - A panic inside an embedder's implementation is converted into a [`ChannelError`].

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::time;

use crate::connection::{ConnectionMethods, Transport, TransportStream};
use crate::error::ChannelError;
use crate::events::{Bus, Event, EventKind};
use crate::identity::Subscriber;
use crate::subscribers::panic_message;

/// Fire-and-forget server notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ServerCall {
    Bind(String),
    Unbind(String),
    KeepAlive,
}

/// Awaits `fut`, bounded by `timeout` when set; panics become [`ChannelError::Unavailable`].
async fn guarded<T, F>(timeout: Option<Duration>, fut: F) -> Result<T, ChannelError>
where
    F: Future<Output = Result<T, ChannelError>>,
{
    let fut = AssertUnwindSafe(fut).catch_unwind();
    let res = match timeout {
        Some(dur) => time::timeout(dur, fut)
            .await
            .map_err(|_elapsed| ChannelError::Timeout { timeout: dur })?,
        None => fut.await,
    };
    match res {
        Ok(r) => r,
        Err(panic_err) => Err(ChannelError::unavailable(format!(
            "call panicked: {}",
            panic_message(&*panic_err)
        ))),
    }
}

/// Negotiates a token for `subscriber` and opens the transport with it.
///
/// The token is moved into the transport and not kept.
pub(crate) async fn connect_once(
    methods: &dyn ConnectionMethods,
    transport: &dyn Transport,
    subscriber: &Subscriber,
    timeout: Option<Duration>,
) -> Result<TransportStream, ChannelError> {
    let token = guarded(timeout, methods.connect(subscriber)).await?;
    guarded(timeout, transport.open(token)).await
}

/// Executes one notification and publishes its outcome.
pub(crate) async fn notify_once(
    methods: &dyn ConnectionMethods,
    subscriber: &Subscriber,
    call: &ServerCall,
    timeout: Option<Duration>,
    bus: &Bus,
) {
    let (res, ok, failed, name) = match call {
        ServerCall::Bind(event) => (
            guarded(timeout, methods.bind(subscriber, event)).await,
            EventKind::BindSent,
            EventKind::BindFailed,
            Some(event.as_str()),
        ),
        ServerCall::Unbind(event) => (
            guarded(timeout, methods.unbind(subscriber, event)).await,
            EventKind::UnbindSent,
            EventKind::UnbindFailed,
            Some(event.as_str()),
        ),
        ServerCall::KeepAlive => (
            guarded(timeout, methods.keep_alive(subscriber)).await,
            EventKind::KeepAliveSent,
            EventKind::KeepAliveFailed,
            None,
        ),
    };

    let mut ev = match res {
        Ok(()) => Event::new(ok),
        Err(e) => Event::new(failed).with_reason(e.to_string()),
    };
    ev = ev.with_subscriber(subscriber);
    if let Some(name) = name {
        ev = ev.with_event_name(name);
    }
    bus.publish(ev);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, MemoryTransport, RecordingMethods};

    #[tokio::test]
    async fn connect_once_opens_transport_with_token() {
        let methods = RecordingMethods::new();
        let transport = MemoryTransport::new();
        let s = Subscriber::from("S");

        let stream = connect_once(methods.as_ref(), transport.as_ref(), &s, None).await;
        assert!(stream.is_ok());
        assert_eq!(methods.calls(), vec![Call::Connect("S".into())]);
        assert_eq!(transport.opened(), vec!["token-S"]);
    }

    #[tokio::test]
    async fn connect_failure_skips_transport() {
        let methods = RecordingMethods::new();
        methods.fail_next_connect(ChannelError::unavailable("dns"));
        let transport = MemoryTransport::new();

        let res = connect_once(methods.as_ref(), transport.as_ref(), &"S".into(), None).await;
        assert_eq!(res.unwrap_err(), ChannelError::unavailable("dns"));
        assert!(transport.opened().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_connect_times_out() {
        let methods = RecordingMethods::new();
        methods.delay_connect("S", Duration::from_secs(60));
        let transport = MemoryTransport::new();

        let res = connect_once(
            methods.as_ref(),
            transport.as_ref(),
            &"S".into(),
            Some(Duration::from_secs(1)),
        )
        .await;
        assert_eq!(
            res.unwrap_err(),
            ChannelError::Timeout {
                timeout: Duration::from_secs(1)
            }
        );
    }

    #[tokio::test]
    async fn notifications_publish_outcome() {
        let methods = RecordingMethods::new();
        methods.fail_keep_alive(true);
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let s = Subscriber::from("S");

        notify_once(methods.as_ref(), &s, &ServerCall::Bind("e".into()), None, &bus).await;
        notify_once(methods.as_ref(), &s, &ServerCall::KeepAlive, None, &bus).await;

        let bind = rx.recv().await.unwrap();
        assert_eq!(bind.kind, EventKind::BindSent);
        assert_eq!(bind.event_name.as_deref(), Some("e"));
        assert_eq!(bind.subscriber.as_deref(), Some("S"));

        let keep_alive = rx.recv().await.unwrap();
        assert_eq!(keep_alive.kind, EventKind::KeepAliveFailed);
        assert_eq!(
            methods.calls(),
            vec![
                Call::Bind("S".into(), "e".into()),
                Call::KeepAlive("S".into())
            ]
        );
    }
}
