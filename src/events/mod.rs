//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by the lifecycle driver, the
//! dispatcher and the server calls it spawns.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Driver`, `Dispatcher`, spawned server calls, `PushManager`
//!   (bulk unbind), `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the subscriber listener spawned by `PushManagerBuilder::build`
//!   (fans out to `SubscriberSet`) and [`PushManager::events`](crate::PushManager::events).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
