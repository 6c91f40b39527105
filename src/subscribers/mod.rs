//! # Event subscribers for the push runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out and the
//! built-in [`LogWriter`] for runtime events broadcast through the [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Driver ── publish(Event) ──► Bus ──► subscriber listener ──► SubscriberSet::emit
//!                                                                     │
//!                                                         ┌───────────┼──────────┐
//!                                                         ▼           ▼          ▼
//!                                                     LogWriter    Metrics     Custom
//! ```

mod subscribe;
mod subscriber_set;

#[cfg(feature = "logging")]
mod embedded;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub use subscribe::Subscribe;
pub(crate) use subscriber_set::panic_message;
pub use subscriber_set::SubscriberSet;
