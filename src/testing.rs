//! # Test doubles for push channels.
//!
//! Available under `cfg(test)` and the `testing` feature. Embedders use them to exercise
//! code built on [`PushManager`](crate::PushManager) without a server:
//!
//! - [`RecordingMethods`]: records every server call, with scripted connect results;
//! - [`MemoryTransport`]: in-memory channels keyed by token, fed from the test;
//! - [`ScriptedIndices`]: deterministic subscriber identifiers;
//! - [`settle`]: lets spawned tasks run without advancing the clock.
//!
//! The default token returned by [`RecordingMethods`] for subscriber `S` is `token-S`.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::connection::{ChannelToken, ConnectionMethods, Transport, TransportEvent, TransportStream};
use crate::error::ChannelError;
use crate::identity::{IndexSource, Subscriber};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One recorded server call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect(String),
    Bind(String, String),
    Unbind(String, String),
    KeepAlive(String),
}

/// [`ConnectionMethods`] that records calls and succeeds unless scripted otherwise.
#[derive(Debug, Default)]
pub struct RecordingMethods {
    calls: Mutex<Vec<Call>>,
    connect_script: Mutex<VecDeque<Result<ChannelToken, ChannelError>>>,
    connect_delays: Mutex<HashMap<String, Duration>>,
    fail_keep_alive: AtomicBool,
}

impl RecordingMethods {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every call in the order it was made.
    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    /// Subscribers passed to `connect`.
    pub fn connects(&self) -> Vec<String> {
        self.filter(|c| match c {
            Call::Connect(s) => Some(s.clone()),
            _ => None,
        })
    }

    /// `(subscriber, event)` pairs passed to `bind`.
    pub fn binds(&self) -> Vec<(String, String)> {
        self.filter(|c| match c {
            Call::Bind(s, e) => Some((s.clone(), e.clone())),
            _ => None,
        })
    }

    /// `(subscriber, event)` pairs passed to `unbind`.
    pub fn unbinds(&self) -> Vec<(String, String)> {
        self.filter(|c| match c {
            Call::Unbind(s, e) => Some((s.clone(), e.clone())),
            _ => None,
        })
    }

    /// Subscribers passed to `keep_alive`.
    pub fn keep_alives(&self) -> Vec<String> {
        self.filter(|c| match c {
            Call::KeepAlive(s) => Some(s.clone()),
            _ => None,
        })
    }

    /// Queues the result of a future `connect` call.
    pub fn script_connect(&self, result: Result<ChannelToken, ChannelError>) {
        lock(&self.connect_script).push_back(result);
    }

    /// Makes the next unscripted `connect` call fail with `err`.
    pub fn fail_next_connect(&self, err: ChannelError) {
        self.script_connect(Err(err));
    }

    /// Delays every `connect` for `subscriber` by `delay` (tokio time).
    pub fn delay_connect(&self, subscriber: &str, delay: Duration) {
        lock(&self.connect_delays).insert(subscriber.to_string(), delay);
    }

    /// Makes `keep_alive` fail while `fail` is set.
    pub fn fail_keep_alive(&self, fail: bool) {
        self.fail_keep_alive.store(fail, Ordering::SeqCst);
    }

    fn record(&self, call: Call) {
        lock(&self.calls).push(call);
    }

    fn filter<T>(&self, f: impl FnMut(&Call) -> Option<T>) -> Vec<T> {
        lock(&self.calls).iter().filter_map(f).collect()
    }
}

#[async_trait]
impl ConnectionMethods for RecordingMethods {
    async fn connect(&self, subscriber: &Subscriber) -> Result<ChannelToken, ChannelError> {
        self.record(Call::Connect(subscriber.to_string()));
        let delay = lock(&self.connect_delays).get(subscriber.as_str()).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = lock(&self.connect_script).pop_front();
        scripted.unwrap_or_else(|| Ok(ChannelToken::new(format!("token-{subscriber}"))))
    }

    async fn bind(&self, subscriber: &Subscriber, event: &str) -> Result<(), ChannelError> {
        self.record(Call::Bind(subscriber.to_string(), event.to_string()));
        Ok(())
    }

    async fn unbind(&self, subscriber: &Subscriber, event: &str) -> Result<(), ChannelError> {
        self.record(Call::Unbind(subscriber.to_string(), event.to_string()));
        Ok(())
    }

    async fn keep_alive(&self, subscriber: &Subscriber) -> Result<(), ChannelError> {
        self.record(Call::KeepAlive(subscriber.to_string()));
        if self.fail_keep_alive.load(Ordering::SeqCst) {
            return Err(ChannelError::unavailable("keep-alive refused"));
        }
        Ok(())
    }
}

/// [`Transport`] backed by in-memory channels, one per opened token.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    channels: Mutex<HashMap<String, mpsc::Sender<TransportEvent>>>,
    opened: Mutex<Vec<String>>,
    open_script: Mutex<VecDeque<ChannelError>>,
}

impl MemoryTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Tokens passed to `open`, in order.
    pub fn opened(&self) -> Vec<String> {
        lock(&self.opened).clone()
    }

    /// Whether the channel of `token` exists and its stream has not been dropped.
    pub fn is_open(&self, token: &str) -> bool {
        lock(&self.channels)
            .get(token)
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Number of channels whose stream is still held by the consumer.
    pub fn open_count(&self) -> usize {
        lock(&self.channels)
            .values()
            .filter(|tx| !tx.is_closed())
            .count()
    }

    /// Delivers a raw payload on `token`'s channel. Returns `false` if it is not open.
    pub fn push(&self, token: &str, raw: impl Into<String>) -> bool {
        self.send(token, TransportEvent::Message(raw.into()))
    }

    /// Reports a transport error on `token`'s channel.
    pub fn fail(&self, token: &str, reason: impl Into<String>) -> bool {
        self.send(token, TransportEvent::Error(reason.into()))
    }

    /// Ends `token`'s stream from the server side.
    pub fn close(&self, token: &str) {
        lock(&self.channels).remove(token);
    }

    /// Makes the next `open` call fail with `err`.
    pub fn fail_next_open(&self, err: ChannelError) {
        lock(&self.open_script).push_back(err);
    }

    fn send(&self, token: &str, ev: TransportEvent) -> bool {
        lock(&self.channels)
            .get(token)
            .is_some_and(|tx| tx.try_send(ev).is_ok())
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn open(&self, token: ChannelToken) -> Result<TransportStream, ChannelError> {
        let token = token.into_inner();
        lock(&self.opened).push(token.clone());
        if let Some(err) = lock(&self.open_script).pop_front() {
            return Err(err);
        }
        let (tx, rx) = mpsc::channel(64);
        lock(&self.channels).insert(token, tx);
        Ok(TransportStream::from_receiver(rx))
    }
}

/// [`IndexSource`] cycling through a fixed list of indices.
#[derive(Debug, Clone)]
pub struct ScriptedIndices {
    indices: Vec<usize>,
    pos: usize,
}

impl ScriptedIndices {
    /// Creates a source cycling through `indices` (an empty list yields zeros).
    pub fn new(indices: Vec<usize>) -> Self {
        Self { indices, pos: 0 }
    }
}

impl IndexSource for ScriptedIndices {
    fn next_index(&mut self, _bound: usize) -> usize {
        if self.indices.is_empty() {
            return 0;
        }
        let i = self.indices[self.pos % self.indices.len()];
        self.pos += 1;
        i
    }
}

/// Yields repeatedly so spawned tasks make progress without the clock moving.
pub async fn settle() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}
