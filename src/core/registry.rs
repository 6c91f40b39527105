//! # Event registry: push event name → ordered handlers.
//!
//! Shared by the [`PushManager`](crate::PushManager) handle (bind/unbind) and the driver
//! (dispatch, rebind on connect).
//!
//! ## Rules
//! - Insertion order is dispatch order.
//! - Handles are matched by registration id, never by the wrapped closure.
//! - An entry emptied by single-handler removal is deleted.
//! - The lock is never held while a handler runs: dispatch works on a snapshot.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::message::PushMessage;

/// Caller-supplied handler invoked for every message of its event.
pub type Handler = Arc<dyn Fn(&PushMessage) + Send + Sync + 'static>;

/// Opaque handle returned by [`PushManager::bind`](crate::PushManager::bind).
///
/// Pass it back to [`PushManager::unbind`](crate::PushManager::unbind) to remove exactly
/// this registration. Clones refer to the same registration.
#[derive(Clone)]
pub struct BoundHandler {
    id: u64,
    event: Arc<str>,
    handler: Handler,
}

impl BoundHandler {
    /// Name of the event this handler is bound to.
    pub fn event(&self) -> &str {
        &self.event
    }

    pub(crate) fn call(&self, message: &PushMessage) {
        (self.handler)(message);
    }
}

impl PartialEq for BoundHandler {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for BoundHandler {}

impl fmt::Debug for BoundHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundHandler")
            .field("id", &self.id)
            .field("event", &self.event)
            .finish_non_exhaustive()
    }
}

/// Outcome of a single-handler removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Removal {
    /// No entry for the event.
    UnknownEvent,
    /// The event exists but the handle is not in its list.
    NotBound,
    /// The handle was removed.
    Removed,
}

/// Registration ids are unique across all registries of the process.
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Thread-safe event → handlers map.
#[derive(Default)]
pub(crate) struct Registry {
    events: Mutex<HashMap<String, Vec<BoundHandler>>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<BoundHandler>>> {
        // Handlers never run under this lock, so a poisoned map is still consistent.
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `handler` to the list of `event`, creating the list if absent.
    pub(crate) fn insert(&self, event: &str, handler: Handler) -> BoundHandler {
        let bound = BoundHandler {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            event: Arc::from(event),
            handler,
        };
        self.lock()
            .entry(event.to_string())
            .or_default()
            .push(bound.clone());
        bound
    }

    /// Removes the whole entry of `event`. Returns whether it existed.
    pub(crate) fn remove_all(&self, event: &str) -> bool {
        self.lock().remove(event).is_some()
    }

    /// Removes a single registration, keeping the order of the rest.
    pub(crate) fn remove(&self, event: &str, handler: &BoundHandler) -> Removal {
        let mut events = self.lock();
        let Some(list) = events.get_mut(event) else {
            return Removal::UnknownEvent;
        };
        let Some(pos) = list.iter().position(|h| h == handler) else {
            return Removal::NotBound;
        };
        list.remove(pos);
        if list.is_empty() {
            events.remove(event);
        }
        Removal::Removed
    }

    /// Snapshot of the handlers of `event`, in registration order.
    pub(crate) fn handlers(&self, event: &str) -> Vec<BoundHandler> {
        self.lock().get(event).cloned().unwrap_or_default()
    }

    /// Names of all events with at least one handler, sorted.
    pub(crate) fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Whether `event` has a registry entry.
    pub(crate) fn contains(&self, event: &str) -> bool {
        self.lock().contains_key(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn noop() -> Handler {
        Arc::new(|_: &PushMessage| {})
    }

    #[test]
    fn insert_preserves_order() {
        let reg = Registry::new();
        let a = reg.insert("e", noop());
        let b = reg.insert("e", noop());
        let c = reg.insert("e", noop());
        assert_eq!(reg.handlers("e"), vec![a, b, c]);
        assert!(reg.handlers("other").is_empty());
    }

    #[test]
    fn identity_is_by_registration_not_closure() {
        let reg = Registry::new();
        let shared = noop();
        let a = reg.insert("e", shared.clone());
        let b = reg.insert("e", shared);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());

        assert_eq!(reg.remove("e", &a), Removal::Removed);
        assert_eq!(reg.handlers("e"), vec![b]);
    }

    #[test]
    fn removal_outcomes() {
        let reg = Registry::new();
        let a = reg.insert("e", noop());
        let other = reg.insert("other", noop());

        assert_eq!(reg.remove("missing", &a), Removal::UnknownEvent);
        assert_eq!(reg.remove("e", &other), Removal::NotBound);
        assert_eq!(reg.remove("e", &a), Removal::Removed);
        assert!(!reg.contains("e"), "emptied entry is deleted");
        assert_eq!(reg.remove("e", &a), Removal::UnknownEvent);
    }

    #[test]
    fn middle_removal_keeps_order() {
        let reg = Registry::new();
        let a = reg.insert("e", noop());
        let b = reg.insert("e", noop());
        let c = reg.insert("e", noop());
        reg.remove("e", &b);
        assert_eq!(reg.handlers("e"), vec![a, c]);
    }

    #[test]
    fn remove_all_drops_entry() {
        let reg = Registry::new();
        reg.insert("e", noop());
        reg.insert("e", noop());
        assert!(reg.remove_all("e"));
        assert!(!reg.remove_all("e"));
        assert!(reg.handlers("e").is_empty());
    }

    #[test]
    fn event_names_are_sorted() {
        let reg = Registry::new();
        reg.insert("zeta", noop());
        reg.insert("alpha", noop());
        reg.insert("alpha", noop());
        assert_eq!(reg.event_names(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn bound_handler_calls_wrapped_closure() {
        let reg = Registry::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let bound = reg.insert(
            "e",
            Arc::new(move |_: &PushMessage| {
                h.fetch_add(1, Ordering::SeqCst);
            }),
        );
        let msg = PushMessage::decode(r#"{"event":"e"}"#).unwrap();
        bound.call(&msg);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(bound.event(), "e");
    }
}
