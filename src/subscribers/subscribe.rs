//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for plugging observers (logging, metrics, alerting)
//! into the push runtime. Each subscriber is driven by a dedicated worker loop fed by a
//! bounded queue owned by the [`SubscriberSet`](crate::SubscriberSet).
//!
//! ## Contract
//! - Implementations may be slow; they do **not** block the driver, the dispatcher, or
//!   other subscribers.
//! - Each subscriber **declares** its preferred queue capacity via
//!   [`Subscribe::queue_capacity`]. If a queue overflows, events for that subscriber are
//!   **dropped** and a [`SubscriberOverflow`](crate::EventKind::SubscriberOverflow) is published.
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use pushvisor::{Event, EventKind, Subscribe};
//!
//! #[derive(Default)]
//! struct Reconnects(AtomicU64);
//!
//! #[async_trait::async_trait]
//! impl Subscribe for Reconnects {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::ReconnectScheduled {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!     fn name(&self) -> &'static str { "reconnects" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Contract for event subscribers.
///
/// Called from a subscriber-dedicated worker task. Implementations should avoid
/// blocking the async runtime (prefer async I/O and cooperative waits).
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single event for this subscriber.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for logs/metrics).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this subscriber's queue.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
