//! # PushManager: the cloneable handle of a push channel.
//!
//! The handle owns the event registry and subscriber id generation; everything that involves
//! time or the transport is forwarded to the driver task as a [`Command`].
//!
//! ```text
//! open_connection(s?) ─► resolve id ─────────────► Command::Open(s)
//! bind(e, f)          ─► registry.insert ────────► Command::Bind(e)
//! unbind(e, Some(h))  ─► registry.remove ── Removed? ─► Command::Unbind(e)
//! unbind(e, None)     ─► registry.remove_all ─► HandlersCleared
//!                                               └─ notify_bulk_unbind? ─► Command::Unbind(e)
//! shutdown()          ─► ShutdownRequested, cancel driver, wait for driver and listener
//! ```
//!
//! All methods except [`PushManager::shutdown`] return without waiting for the server.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::builder::PushManagerBuilder;
use super::config::Config;
use super::driver::Command;
use super::registry::{BoundHandler, Registry, Removal};
use super::status::ConnectionStatus;
use crate::connection::{MethodsRef, TransportRef};
use crate::events::{Bus, Event, EventKind};
use crate::identity::{Subscriber, SubscriberIds};
use crate::message::PushMessage;

/// Handle to a running push channel.
///
/// Cheap to clone; all clones drive the same channel. Dropping the last clone stops the
/// driver, but only [`shutdown`](PushManager::shutdown) waits for it.
#[derive(Clone)]
pub struct PushManager {
    inner: Arc<Inner>,
}

pub(crate) struct Inner {
    pub(crate) cfg: Config,
    pub(crate) ids: Mutex<SubscriberIds>,
    pub(crate) registry: Arc<Registry>,
    pub(crate) commands: mpsc::UnboundedSender<Command>,
    pub(crate) bus: Bus,
    pub(crate) status: watch::Receiver<ConnectionStatus>,
    pub(crate) token: CancellationToken,
    pub(crate) tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl PushManager {
    /// Starts building a manager around the embedder's server operations and transport.
    pub fn builder(cfg: Config, methods: MethodsRef, transport: TransportRef) -> PushManagerBuilder {
        PushManagerBuilder::new(cfg, methods, transport)
    }

    pub(crate) fn from_inner(inner: Inner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Begins connecting as `subscriber`, generating an identifier when `None`.
    ///
    /// Returns the subscriber used. The current transport, if any, stays open until the new
    /// connect resolves; a pending reconnect is cancelled.
    pub fn open_connection(&self, subscriber: Option<Subscriber>) -> Subscriber {
        let subscriber = lock(&self.inner.ids).resolve(subscriber);
        self.send(Command::Open(subscriber.clone()));
        subscriber
    }

    /// Registers `handler` for push events named `event` and notifies the server.
    ///
    /// Handlers of the same event run in registration order. Without an active subscriber
    /// the server is told once a connect succeeds.
    ///
    /// On a multi-thread runtime a `bind` racing with a successful connect may reach the
    /// server twice for the same subscriber: once from the rebind of registered events and
    /// once from this call. Server-side bind is expected to be idempotent.
    pub fn bind<F>(&self, event: impl Into<String>, handler: F) -> BoundHandler
    where
        F: Fn(&PushMessage) + Send + Sync + 'static,
    {
        let event = event.into();
        let bound = self.inner.registry.insert(&event, Arc::new(handler));
        self.send(Command::Bind(event));
        bound
    }

    /// Removes one handler (`Some`) or every handler (`None`) of `event`.
    ///
    /// Unknown events and handles not bound to `event` are ignored without a server call.
    /// Removing every handler only notifies the server when
    /// [`Config::notify_bulk_unbind`] is set.
    pub fn unbind(&self, event: &str, handler: Option<&BoundHandler>) {
        match handler {
            Some(handler) => {
                if self.inner.registry.remove(event, handler) == Removal::Removed {
                    self.send(Command::Unbind(event.to_string()));
                }
            }
            None => {
                if !self.inner.registry.remove_all(event) {
                    return;
                }
                let notify = self.inner.cfg.notify_bulk_unbind;
                self.inner.bus.publish(
                    Event::new(EventKind::HandlersCleared)
                        .with_event_name(event)
                        .with_reason(if notify {
                            "server notified"
                        } else {
                            "server not notified"
                        }),
                );
                if notify {
                    self.send(Command::Unbind(event.to_string()));
                }
            }
        }
    }

    /// Whether any handler is bound to `event`.
    pub fn is_bound(&self, event: &str) -> bool {
        self.inner.registry.contains(event)
    }

    /// Names of all events with at least one handler, sorted.
    pub fn bound_events(&self) -> Vec<String> {
        self.inner.registry.event_names()
    }

    /// Current lifecycle snapshot.
    pub fn status(&self) -> ConnectionStatus {
        self.inner.status.borrow().clone()
    }

    /// Receiver notified on every status change.
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.inner.status.clone()
    }

    /// Subscriber whose connect last succeeded.
    pub fn active_subscriber(&self) -> Option<Subscriber> {
        self.inner.status.borrow().subscriber.clone()
    }

    /// Raw receiver of runtime events.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.inner.bus.subscribe()
    }

    /// Configuration the manager was built with.
    pub fn config(&self) -> &Config {
        &self.inner.cfg
    }

    /// Stops the channel: closes the transport, cancels timers and in-flight calls, then
    /// waits until subscribers have drained their queues.
    ///
    /// Idempotent; later commands are ignored.
    pub async fn shutdown(&self) {
        if self.inner.token.is_cancelled() {
            return;
        }
        self.inner
            .bus
            .publish(Event::new(EventKind::ShutdownRequested));
        self.inner.token.cancel();

        let tasks = std::mem::take(&mut *lock(&self.inner.tasks));
        for task in tasks {
            let _ = task.await;
        }
    }

    fn send(&self, cmd: Command) {
        // The driver is gone after shutdown; commands are dropped.
        let _ = self.inner.commands.send(cmd);
    }
}

impl std::fmt::Debug for PushManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushManager")
            .field("status", &*self.inner.status.borrow())
            .finish_non_exhaustive()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ConnectionState;
    use crate::testing::{Call, MemoryTransport, RecordingMethods, ScriptedIndices, settle};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn manager(cfg: Config) -> (PushManager, Arc<RecordingMethods>, Arc<MemoryTransport>) {
        let methods = RecordingMethods::new();
        let transport = MemoryTransport::new();
        let pm = PushManager::builder(cfg, methods.clone(), transport.clone()).build();
        (pm, methods, transport)
    }

    async fn connected(cfg: Config) -> (PushManager, Arc<RecordingMethods>, Arc<MemoryTransport>) {
        let (pm, methods, transport) = manager(cfg);
        pm.open_connection(Some("S".into()));
        settle().await;
        assert_eq!(pm.status().state, ConnectionState::Connected);
        (pm, methods, transport)
    }

    fn counter(hits: &Arc<AtomicUsize>) -> impl Fn(&PushMessage) + Send + Sync + 'static {
        let hits = hits.clone();
        move |_: &PushMessage| {
            hits.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn generated_subscriber_uses_index_source() {
        let methods = RecordingMethods::new();
        let transport = MemoryTransport::new();
        let pm = PushManager::builder(Config::default(), methods.clone(), transport)
            .with_index_source(ScriptedIndices::new(vec![0, 1, 2]))
            .build();

        let s = pm.open_connection(None);
        assert_eq!(s.as_str(), "ABCABCABCABCABC");
        settle().await;
        assert_eq!(methods.connects(), vec!["ABCABCABCABCABC"]);
        assert_eq!(pm.active_subscriber(), Some(s));
    }

    #[tokio::test(start_paused = true)]
    async fn three_handlers_bound_and_invoked() {
        let (pm, methods, transport) = connected(Config::default()).await;
        let hits = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            pm.bind("fake-event", counter(&hits));
        }
        settle().await;
        assert_eq!(
            methods.binds(),
            vec![("S".to_string(), "fake-event".to_string()); 3]
        );

        transport.push("token-S", r#"{"event":"other-event"}"#);
        settle().await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        transport.push("token-S", r#"{"event":"fake-event"}"#);
        settle().await;
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn unbind_single_handler_notifies_each_time() {
        let (pm, methods, transport) = connected(Config::default()).await;
        let hits = Arc::new(AtomicUsize::new(0));
        let a = pm.bind("fake-event", counter(&hits));
        let b = pm.bind("fake-event", counter(&hits));
        let c = pm.bind("fake-event", counter(&hits));

        pm.unbind("fake-event", Some(&b));
        pm.unbind("fake-event", Some(&a));
        settle().await;
        assert_eq!(methods.unbinds().len(), 2);

        transport.push("token-S", r#"{"event":"fake-event"}"#);
        settle().await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        pm.unbind("fake-event", Some(&c));
        assert!(!pm.is_bound("fake-event"));
    }

    #[tokio::test(start_paused = true)]
    async fn unbind_all_removes_every_handler() {
        let (pm, _methods, transport) = connected(Config::default()).await;
        let hits = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            pm.bind("fake-event", counter(&hits));
        }
        pm.unbind("fake-event", None);
        transport.push("token-S", r#"{"event":"fake-event"}"#);
        settle().await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(pm.bound_events().is_empty());
    }

    // Removing every handler is local only, unlike single-handler removal.
    #[tokio::test(start_paused = true)]
    async fn bulk_unbind_is_not_announced_to_server() {
        let (pm, methods, _transport) = connected(Config::default()).await;
        let mut rx = pm.events();
        pm.bind("fake-event", |_: &PushMessage| {});
        pm.unbind("fake-event", None);
        settle().await;
        assert!(methods.unbinds().is_empty());

        let mut cleared = None;
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::HandlersCleared {
                cleared = Some(ev);
            }
        }
        let cleared = cleared.expect("HandlersCleared published");
        assert_eq!(cleared.reason.as_deref(), Some("server not notified"));
    }

    #[tokio::test(start_paused = true)]
    async fn bulk_unbind_notifies_when_enabled() {
        let cfg = Config {
            notify_bulk_unbind: true,
            ..Config::default()
        };
        let (pm, methods, _transport) = connected(cfg).await;
        pm.bind("fake-event", |_: &PushMessage| {});
        pm.unbind("fake-event", None);
        settle().await;
        assert_eq!(
            methods.unbinds(),
            vec![("S".to_string(), "fake-event".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_event_or_handle_makes_no_server_call() {
        let (pm, methods, _transport) = connected(Config::default()).await;
        let a = pm.bind("fake-event", |_: &PushMessage| {});
        let other = pm.bind("other-event", |_: &PushMessage| {});

        pm.unbind("missing-event", None);
        pm.unbind("missing-event", Some(&a));
        pm.unbind("fake-event", Some(&other));
        settle().await;
        assert!(methods.unbinds().is_empty());
        assert!(pm.is_bound("fake-event"));
    }

    #[tokio::test(start_paused = true)]
    async fn binds_before_connect_are_sent_after_connect() {
        let (pm, methods, _transport) = manager(Config::default());
        let mut rx = pm.events();
        pm.bind("early", |_: &PushMessage| {});
        settle().await;
        assert!(methods.binds().is_empty());

        let mut skipped = false;
        while let Ok(ev) = rx.try_recv() {
            skipped |= ev.kind == EventKind::NotifySkipped;
        }
        assert!(skipped);

        pm.open_connection(Some("S".into()));
        settle().await;
        assert_eq!(methods.binds(), vec![("S".to_string(), "early".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn dispatch_hook_runs_after_handlers() {
        let methods = RecordingMethods::new();
        let transport = MemoryTransport::new();
        let flushes = Arc::new(AtomicUsize::new(0));
        let f = flushes.clone();
        let pm = PushManager::builder(Config::default(), methods, transport.clone())
            .with_hook(move |_: &PushMessage| {
                f.fetch_add(1, Ordering::SeqCst);
            })
            .build();
        pm.bind("e", |_: &PushMessage| {});
        pm.bind("e", |_: &PushMessage| {});
        pm.open_connection(Some("S".into()));
        settle().await;

        transport.push("token-S", r#"{"event":"e"}"#);
        settle().await;
        assert_eq!(flushes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_closes_transport_and_ignores_later_calls() {
        let (pm, methods, transport) = connected(Config::default()).await;
        let mut rx = pm.events();
        pm.shutdown().await;

        assert!(!transport.is_open("token-S"));
        assert_eq!(pm.status().state, ConnectionState::Idle);

        pm.open_connection(Some("T".into()));
        pm.bind("late", |_: &PushMessage| {});
        settle().await;
        assert_eq!(methods.connects(), vec!["S"]);
        assert!(methods.binds().is_empty());

        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push(ev.kind);
        }
        assert_eq!(
            kinds,
            vec![EventKind::ShutdownRequested, EventKind::Stopped]
        );

        pm.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn recording_calls_are_ordered() {
        let (pm, methods, _transport) = connected(Config::default()).await;
        let h = pm.bind("e", |_: &PushMessage| {});
        settle().await;
        pm.unbind("e", Some(&h));
        settle().await;
        assert_eq!(
            methods.calls(),
            vec![
                Call::Connect("S".into()),
                Call::Bind("S".into(), "e".into()),
                Call::Unbind("S".into(), "e".into()),
            ]
        );
    }
}
