//! # Collaborators supplied by the embedding application.
//!
//! The runtime never talks to a network on its own. It drives two injected seams:
//! - [`ConnectionMethods`] - the four server operations (connect, bind, unbind, keep-alive);
//! - [`Transport`] - opens the duplex channel for a [`ChannelToken`] and yields a
//!   [`TransportStream`] of [`TransportEvent`]s.
//!
//! Both are `async_trait` objects shared as `Arc<dyn ...>`.

mod methods;
mod transport;

pub use methods::{ChannelToken, ConnectionMethods, MethodsRef};
pub use transport::{Transport, TransportEvent, TransportRef, TransportStream};
