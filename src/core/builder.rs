use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::{
    connection::{MethodsRef, TransportRef},
    core::Config,
    events::Bus,
    identity::{IndexSource, SubscriberIds, ThreadRandom},
    subscribers::{Subscribe, SubscriberSet},
};
use super::{
    dispatcher::{DispatchHook, Dispatcher, no_hook},
    driver::{Driver, DriverParts},
    manager::{Inner, PushManager},
    registry::Registry,
    status::ConnectionStatus,
};

/// Builder for constructing a [`PushManager`] with optional features.
pub struct PushManagerBuilder {
    cfg: Config,
    methods: MethodsRef,
    transport: TransportRef,
    subscribers: Vec<Arc<dyn Subscribe>>,
    hook: Option<Arc<dyn DispatchHook>>,
    index_source: Option<Box<dyn IndexSource>>,
}

impl PushManagerBuilder {
    /// Creates a new builder with the given configuration and server bindings.
    pub fn new(cfg: Config, methods: MethodsRef, transport: TransportRef) -> Self {
        Self {
            cfg,
            methods,
            transport,
            subscribers: Vec::new(),
            hook: None,
            index_source: None,
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (connects, failures, dispatch problems)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Sets the side effect run after every handler invocation.
    pub fn with_hook(mut self, hook: impl DispatchHook) -> Self {
        self.hook = Some(Arc::new(hook));
        self
    }

    /// Replaces the random source used for generated subscriber identifiers.
    pub fn with_index_source(mut self, source: impl IndexSource) -> Self {
        self.index_source = Some(Box::new(source));
        self
    }

    /// Builds the manager and spawns its driver and subscriber listener.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build(self) -> PushManager {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(self.subscribers, bus.clone());
        let registry = Arc::new(Registry::new());
        let token = CancellationToken::new();
        let done = CancellationToken::new();

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::default());

        let source = self
            .index_source
            .unwrap_or_else(|| Box::new(ThreadRandom));
        let ids = SubscriberIds::new(self.cfg.subscriber_id_length_clamped(), source);

        let dispatcher = Dispatcher::new(
            Arc::clone(&registry),
            self.hook.unwrap_or_else(no_hook),
            bus.clone(),
        );
        let driver = Driver::new(DriverParts {
            cfg: self.cfg.clone(),
            methods: self.methods,
            transport: self.transport,
            registry: Arc::clone(&registry),
            dispatcher,
            bus: bus.clone(),
            status: status_tx,
            commands: cmd_rx,
        });

        // Subscribe before the driver can publish anything.
        let listener = subscriber_listener(&bus, subs, done.clone());
        let driver = tokio::spawn(driver.run(token.clone(), done));

        PushManager::from_inner(Inner {
            cfg: self.cfg,
            ids: Mutex::new(ids),
            registry,
            commands: cmd_tx,
            bus,
            status: status_rx,
            token,
            tasks: Mutex::new(vec![driver, listener]),
        })
    }
}

/// Forwards bus events to the subscriber set until `done`, then drains and shuts it down.
fn subscriber_listener(
    bus: &Bus,
    subs: SubscriberSet,
    done: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                res = rx.recv() => match res {
                    Ok(ev) => subs.emit(ev),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                },
                _ = done.cancelled() => break,
            }
        }
        subs.shutdown().await;
    })
}
