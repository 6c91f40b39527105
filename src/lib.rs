//! # pushvisor
//!
//! **Pushvisor** keeps one client-side push channel alive and fans its messages out to
//! registered handlers.
//!
//! The server exposes four operations (connect, bind, unbind, keep-alive) and a duplex
//! transport opened with a token obtained from `connect`. The crate owns everything around
//! them: subscriber identity, the keep-alive schedule, reconnects after failures, the
//! event → handlers registry and payload dispatch. The server bindings themselves are
//! injected through [`ConnectionMethods`] and [`Transport`].
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  application
//!     │ open_connection / bind / unbind / shutdown
//!     ▼
//! ┌──────────────────────────┐   commands   ┌─────────────────────────────────────────┐
//! │ PushManager (handle)     │ ───────────► │ Driver task (one per manager)           │
//! │ - SubscriberIds          │              │ - connect attempts (generation-tagged)  │
//! │ - Registry (event → fns) │ ◄─ shared ─► │ - keep-alive interval                   │
//! │ - watch<ConnectionStatus>│ ◄─ status ── │ - reconnect timer (ReconnectPolicy)     │
//! └──────────────────────────┘              │ - TransportStream ─► Dispatcher ─► fns  │
//!                                           │ - JoinSet of server calls               │
//!                                           └──────┬─────────────────────┬────────────┘
//!                                 ConnectionMethods│           Transport │
//!                                  (injected)      ▼                     ▼ (injected)
//!                                               server                 socket
//!
//!   Driver/Dispatcher ── publish(Event) ──► Bus ──► subscriber listener ──► SubscriberSet
//!                                                                   ┌─────────┼─────────┐
//!                                                                   ▼         ▼         ▼
//!                                                               LogWriter  metrics   custom
//! ```
//!
//! ### Lifecycle
//! ```text
//! open_connection(s) ──► connect(s) ──► token ──► Transport::open(token)
//!    ├─ ok:   install transport, restart keep-alive, rebind events if s changed
//!    └─ err:  wait ReconnectPolicy::next(failures), retry connect(s)
//!
//! transport error / end ──► drop transport, stop keep-alive, connect(active) immediately
//! keep-alive tick       ──► keep_alive(active)   (failures are only reported)
//! message               ──► decode JSON ──► handlers of message["event"], in order
//! ```
//!
//! ## Features
//! | Area              | Description                                                    | Key types / traits                          |
//! |-------------------|----------------------------------------------------------------|---------------------------------------------|
//! | **Channel**       | Connection lifecycle, keep-alive, reconnect.                   | [`PushManager`], [`ConnectionStatus`]       |
//! | **Handlers**      | Bind closures to push event names.                             | [`BoundHandler`], [`DispatchHook`]          |
//! | **Server seams**  | Inject server operations and the transport.                    | [`ConnectionMethods`], [`Transport`]        |
//! | **Subscriber API**| Observe runtime events (logging, metrics, custom subscribers). | [`Subscribe`], [`Event`]                    |
//! | **Policies**      | Reconnect timing with jitter.                                  | [`ReconnectPolicy`], [`JitterPolicy`]       |
//! | **Errors**        | Typed errors for server calls and payloads.                    | [`ChannelError`], [`MessageError`]          |
//! | **Configuration** | Centralize runtime settings.                                   | [`Config`]                                  |
//!
//! ## Optional features
//! - `logging` (default): exports the built-in [`LogWriter`] subscriber backed by `tracing`.
//! - `testing`: exports the [`testing`] module with in-memory server doubles.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use pushvisor::{
//!     ChannelError, ChannelToken, Config, ConnectionMethods, PushManager, PushMessage,
//!     Subscriber, Transport, TransportStream,
//! };
//!
//! struct Api;
//!
//! #[async_trait]
//! impl ConnectionMethods for Api {
//!     async fn connect(&self, s: &Subscriber) -> Result<ChannelToken, ChannelError> {
//!         Ok(ChannelToken::new(format!("token-{s}")))
//!     }
//!     async fn bind(&self, _: &Subscriber, _: &str) -> Result<(), ChannelError> { Ok(()) }
//!     async fn unbind(&self, _: &Subscriber, _: &str) -> Result<(), ChannelError> { Ok(()) }
//!     async fn keep_alive(&self, _: &Subscriber) -> Result<(), ChannelError> { Ok(()) }
//! }
//!
//! struct Socket;
//!
//! #[async_trait]
//! impl Transport for Socket {
//!     async fn open(&self, _token: ChannelToken) -> Result<TransportStream, ChannelError> {
//!         Ok(TransportStream::new(futures::stream::pending()))
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let pm = PushManager::builder(Config::default(), Arc::new(Api), Arc::new(Socket)).build();
//!
//!     pm.bind("order-created", |msg: &PushMessage| {
//!         println!("order {:?}", msg.get("id"));
//!     });
//!     let subscriber = pm.open_connection(None);
//!     assert_eq!(subscriber.as_str().len(), 15);
//!
//!     pm.shutdown().await;
//! }
//! ```
mod connection;
mod core;
mod error;
mod events;
mod identity;
mod message;
mod policies;
mod subscribers;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// ---- Public re-exports ----

pub use connection::{
    ChannelToken, ConnectionMethods, MethodsRef, Transport, TransportEvent, TransportRef,
    TransportStream,
};
pub use crate::core::{
    BoundHandler, Config, ConnectionState, ConnectionStatus, DispatchHook, Handler, PushManager,
    PushManagerBuilder,
};
pub use error::{ChannelError, MessageError};
pub use events::{Event, EventKind};
pub use identity::{IndexSource, Subscriber, SubscriberIds, ThreadRandom};
pub use message::PushMessage;
pub use policies::{JitterPolicy, ReconnectPolicy};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
