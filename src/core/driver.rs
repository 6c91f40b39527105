//! # Driver: the single task that owns the channel lifecycle.
//!
//! The [`PushManager`](crate::PushManager) handle never touches timers or the transport.
//! It sends [`Command`]s to one driver task, which multiplexes every input with
//! `tokio::select!`:
//!
//! ```text
//!                ┌──────────────────────── Driver::run ─────────────────────────┐
//! commands ────► │ Open(s)      → start_connect(s)     (generation += 1)         │
//!                │ Bind(e)      → spawn bind(active, e)  | NotifySkipped        │
//!                │ Unbind(e)    → spawn unbind(active, e)| NotifySkipped        │
//! outcomes ────► │ (gen, s, Ok(stream)) → install transport, keep-alive, rebind │
//!                │ (gen, s, Err)        → ReconnectScheduled, arm retry timer    │
//!                │ (stale gen, ..)      → drop stream, ConnectSuperseded         │
//! transport ───► │ Message(raw) → Dispatcher::dispatch                           │
//!                │ Error | end  → drop transport, reconnect active subscriber   │
//! keep-alive ──► │ tick         → spawn keep_alive(active)                      │
//! retry timer ─► │ fired        → start_connect(same subscriber)                │
//! cancel ──────► │ shutdown: close transport, abort calls, Stopped              │
//!                └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rules
//! - Only the outcome of the most recent connect attempt is applied.
//! - At most one keep-alive interval exists; it is replaced on every successful connect.
//! - A new `Open` keeps the current transport until the new connect resolves.
//! - The retry timer is one-shot and is disarmed by a new `Open` or by shutdown.
//! - Server notifications are fire-and-forget tasks in a `JoinSet`, aborted on shutdown.

use std::future::pending;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio::time::{self, Instant, Interval, MissedTickBehavior, Sleep};
use tokio_util::sync::CancellationToken;

use super::config::Config;
use super::dispatcher::Dispatcher;
use super::registry::Registry;
use super::runner::{ServerCall, connect_once, notify_once};
use super::status::{ConnectionState, ConnectionStatus};
use crate::connection::{MethodsRef, TransportEvent, TransportRef, TransportStream};
use crate::error::ChannelError;
use crate::events::{Bus, Event, EventKind};
use crate::identity::Subscriber;

/// Request from the handle to the driver.
#[derive(Debug)]
pub(crate) enum Command {
    Open(Subscriber),
    Bind(String),
    Unbind(String),
}

/// Result of one connect attempt, tagged with its generation.
struct ConnectOutcome {
    generation: u64,
    subscriber: Subscriber,
    result: Result<TransportStream, ChannelError>,
}

/// Armed reconnect timer.
struct Retry {
    subscriber: Subscriber,
    sleep: Pin<Box<Sleep>>,
}

enum Step {
    Shutdown,
    Command(Command),
    Outcome(ConnectOutcome),
    Transport(Option<TransportEvent>),
    KeepAlive,
    Retry,
    Reaped,
}

/// Everything the driver needs from the builder.
pub(crate) struct DriverParts {
    pub(crate) cfg: Config,
    pub(crate) methods: MethodsRef,
    pub(crate) transport: TransportRef,
    pub(crate) registry: Arc<Registry>,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) bus: Bus,
    pub(crate) status: watch::Sender<ConnectionStatus>,
    pub(crate) commands: mpsc::UnboundedReceiver<Command>,
}

pub(crate) struct Driver {
    cfg: Config,
    methods: MethodsRef,
    transport: TransportRef,
    registry: Arc<Registry>,
    dispatcher: Dispatcher,
    bus: Bus,
    status: watch::Sender<ConnectionStatus>,
    commands: mpsc::UnboundedReceiver<Command>,

    outcomes_tx: mpsc::UnboundedSender<ConnectOutcome>,
    outcomes: mpsc::UnboundedReceiver<ConnectOutcome>,
    calls: JoinSet<()>,

    generation: u64,
    /// Subscriber of the attempt matching `generation`, while it is in flight.
    connecting: Option<Subscriber>,
    active: Option<Subscriber>,
    channel: Option<TransportStream>,
    keep_alive: Option<Interval>,
    retry: Option<Retry>,
    failures: u32,
}

impl Driver {
    pub(crate) fn new(parts: DriverParts) -> Self {
        let (outcomes_tx, outcomes) = mpsc::unbounded_channel();
        Self {
            cfg: parts.cfg,
            methods: parts.methods,
            transport: parts.transport,
            registry: parts.registry,
            dispatcher: parts.dispatcher,
            bus: parts.bus,
            status: parts.status,
            commands: parts.commands,
            outcomes_tx,
            outcomes,
            calls: JoinSet::new(),
            generation: 0,
            connecting: None,
            active: None,
            channel: None,
            keep_alive: None,
            retry: None,
            failures: 0,
        }
    }

    /// Runs until `token` is cancelled or every handle is dropped, then cancels `done`.
    pub(crate) async fn run(mut self, token: CancellationToken, done: CancellationToken) {
        loop {
            let step = tokio::select! {
                biased;
                _ = token.cancelled() => Step::Shutdown,
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => Step::Command(cmd),
                    None => Step::Shutdown,
                },
                Some(outcome) = self.outcomes.recv() => Step::Outcome(outcome),
                ev = next_transport_event(&mut self.channel) => Step::Transport(ev),
                _ = next_tick(&mut self.keep_alive) => Step::KeepAlive,
                _ = retry_due(&mut self.retry) => Step::Retry,
                Some(_) = self.calls.join_next(), if !self.calls.is_empty() => Step::Reaped,
            };

            match step {
                Step::Shutdown => break,
                Step::Command(Command::Open(subscriber)) => self.start_connect(subscriber),
                Step::Command(Command::Bind(event)) => self.notify(ServerCall::Bind(event)),
                Step::Command(Command::Unbind(event)) => self.notify(ServerCall::Unbind(event)),
                Step::Outcome(outcome) => self.on_outcome(outcome),
                Step::Transport(Some(TransportEvent::Message(raw))) => {
                    self.dispatcher.dispatch(&raw);
                }
                Step::Transport(Some(TransportEvent::Error(reason))) => {
                    self.on_transport_failed(reason);
                }
                Step::Transport(None) => self.on_transport_failed("transport closed".into()),
                Step::KeepAlive => self.on_keep_alive(),
                Step::Retry => {
                    if let Some(retry) = self.retry.take() {
                        self.start_connect(retry.subscriber);
                    }
                }
                Step::Reaped => {}
            }
            self.publish_status();
        }

        self.stop().await;
        done.cancel();
    }

    /// Starts a new connect attempt; any earlier attempt becomes stale.
    fn start_connect(&mut self, subscriber: Subscriber) {
        self.generation += 1;
        self.retry = None;
        self.connecting = Some(subscriber.clone());

        self.bus.publish(
            Event::new(EventKind::ConnectStarting)
                .with_subscriber(&subscriber)
                .with_attempt(self.generation),
        );

        let generation = self.generation;
        let methods = Arc::clone(&self.methods);
        let transport = Arc::clone(&self.transport);
        let outcomes = self.outcomes_tx.clone();
        let timeout = self.cfg.call_timeout();

        self.calls.spawn(async move {
            let result =
                connect_once(methods.as_ref(), transport.as_ref(), &subscriber, timeout).await;
            let _ = outcomes.send(ConnectOutcome {
                generation,
                subscriber,
                result,
            });
        });
    }

    fn on_outcome(&mut self, outcome: ConnectOutcome) {
        let ConnectOutcome {
            generation,
            subscriber,
            result,
        } = outcome;

        if generation != self.generation {
            // The stream of a stale attempt is dropped here, closing it.
            self.bus.publish(
                Event::new(EventKind::ConnectSuperseded)
                    .with_subscriber(&subscriber)
                    .with_attempt(generation),
            );
            return;
        }
        self.connecting = None;

        match result {
            Ok(stream) => self.on_connected(subscriber, stream),
            Err(e) => self.on_connect_failed(subscriber, e),
        }
    }

    fn on_connected(&mut self, subscriber: Subscriber, stream: TransportStream) {
        let changed = self.active.as_ref() != Some(&subscriber);

        self.channel = Some(stream);
        self.active = Some(subscriber.clone());
        self.failures = 0;
        self.keep_alive = self.cfg.keep_alive_period().map(|period| {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        self.bus.publish(
            Event::new(EventKind::Connected)
                .with_subscriber(&subscriber)
                .with_attempt(self.generation),
        );

        if changed {
            for event in self.registry.event_names() {
                self.spawn_notify(subscriber.clone(), ServerCall::Bind(event));
            }
        }
    }

    fn on_connect_failed(&mut self, subscriber: Subscriber, err: ChannelError) {
        let reason: Arc<str> = Arc::from(format!("{}: {}", err.as_label(), err.as_message()));
        self.bus.publish(
            Event::new(EventKind::ConnectFailed)
                .with_subscriber(&subscriber)
                .with_reason(Arc::clone(&reason)),
        );

        let delay = self.cfg.reconnect.next(self.failures);
        self.failures = self.failures.saturating_add(1);

        self.bus.publish(
            Event::new(EventKind::ReconnectScheduled)
                .with_subscriber(&subscriber)
                .with_reason(reason)
                .with_delay(delay)
                .with_attempt(u64::from(self.failures)),
        );
        self.retry = Some(Retry {
            subscriber,
            sleep: Box::pin(time::sleep(delay)),
        });
    }

    fn on_transport_failed(&mut self, reason: String) {
        self.channel = None;
        self.keep_alive = None;

        let mut ev = Event::new(EventKind::TransportFailed).with_reason(reason);
        if let Some(active) = &self.active {
            ev = ev.with_subscriber(active);
        }
        self.bus.publish(ev);

        // A connect in flight or a pending retry will establish a new transport anyway.
        if self.connecting.is_some() || self.retry.is_some() {
            return;
        }
        if let Some(active) = self.active.clone() {
            self.start_connect(active);
        }
    }

    fn on_keep_alive(&mut self) {
        if let Some(active) = self.active.clone() {
            self.spawn_notify(active, ServerCall::KeepAlive);
        }
    }

    /// Sends a bind/unbind for the active subscriber, or records that there is none.
    fn notify(&mut self, call: ServerCall) {
        match self.active.clone() {
            Some(active) => self.spawn_notify(active, call),
            None => {
                let mut ev = Event::new(EventKind::NotifySkipped)
                    .with_reason("no active subscriber");
                if let ServerCall::Bind(event) | ServerCall::Unbind(event) = &call {
                    ev = ev.with_event_name(event);
                }
                self.bus.publish(ev);
            }
        }
    }

    fn spawn_notify(&mut self, subscriber: Subscriber, call: ServerCall) {
        let methods = Arc::clone(&self.methods);
        let bus = self.bus.clone();
        let timeout = self.cfg.call_timeout();
        self.calls.spawn(async move {
            notify_once(methods.as_ref(), &subscriber, &call, timeout, &bus).await;
        });
    }

    fn state(&self) -> ConnectionState {
        if self.connecting.is_some() {
            ConnectionState::Connecting
        } else if self.retry.is_some() {
            ConnectionState::ReconnectPending
        } else if self.channel.is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Idle
        }
    }

    fn publish_status(&self) {
        let next = ConnectionStatus {
            state: self.state(),
            subscriber: self.active.clone(),
        };
        self.status.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    async fn stop(&mut self) {
        self.channel = None;
        self.keep_alive = None;
        self.retry = None;
        self.connecting = None;
        self.calls.shutdown().await;

        self.status.send_replace(ConnectionStatus {
            state: ConnectionState::Idle,
            subscriber: self.active.clone(),
        });
        self.bus.publish(Event::new(EventKind::Stopped));
    }
}

async fn next_transport_event(channel: &mut Option<TransportStream>) -> Option<TransportEvent> {
    match channel {
        Some(stream) => stream.next_event().await,
        None => pending().await,
    }
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => pending().await,
    }
}

async fn retry_due(retry: &mut Option<Retry>) {
    match retry {
        Some(retry) => retry.sleep.as_mut().await,
        None => pending().await,
    }
}
