//! # Dispatcher: inbound payload → registered handlers.
//!
//! ```text
//! raw text ──► PushMessage::decode ──┬─ Err ──► MessageDropped
//!                                    └─ Ok  ──► registry.handlers(event) (snapshot)
//!                                                 ├─ empty ──► MessageUnhandled
//!                                                 └─ for each in registration order:
//!                                                      handler(&msg)   (panic → HandlerPanicked)
//!                                                      hook.after_dispatch(&msg)
//! ```
//!
//! ## Rules
//! - All handlers of one message run before the call returns.
//! - A panicking handler does not stop the remaining handlers; the hook still runs after it.
//! - Nothing here returns an error to the driver.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::core::registry::Registry;
use crate::events::{Bus, Event, EventKind};
use crate::message::PushMessage;
use crate::subscribers::panic_message;

/// Side effect run after every handler invocation.
///
/// Typically used to schedule a UI refresh once handler state has changed.
/// Closures `Fn(&PushMessage)` implement it directly.
pub trait DispatchHook: Send + Sync + 'static {
    /// Called after each handler has processed `message`.
    fn after_dispatch(&self, message: &PushMessage);
}

impl<F> DispatchHook for F
where
    F: Fn(&PushMessage) + Send + Sync + 'static,
{
    fn after_dispatch(&self, message: &PushMessage) {
        self(message)
    }
}

/// Hook that does nothing.
pub(crate) fn no_hook() -> Arc<dyn DispatchHook> {
    Arc::new(|_: &PushMessage| {})
}

/// Decodes payloads and fans them out to handlers.
pub(crate) struct Dispatcher {
    registry: Arc<Registry>,
    hook: Arc<dyn DispatchHook>,
    bus: Bus,
}

impl Dispatcher {
    pub(crate) fn new(registry: Arc<Registry>, hook: Arc<dyn DispatchHook>, bus: Bus) -> Self {
        Self {
            registry,
            hook,
            bus,
        }
    }

    /// Dispatches one raw payload; returns the number of handlers invoked.
    pub(crate) fn dispatch(&self, raw: &str) -> usize {
        let message = match PushMessage::decode(raw) {
            Ok(message) => message,
            Err(e) => {
                self.bus.publish(
                    Event::new(EventKind::MessageDropped)
                        .with_reason(format!("{}: {e}", e.as_label())),
                );
                return 0;
            }
        };

        let handlers = self.registry.handlers(&message.event);
        if handlers.is_empty() {
            self.bus
                .publish(Event::new(EventKind::MessageUnhandled).with_event_name(&message.event));
            return 0;
        }

        for handler in &handlers {
            if let Err(panic_err) = catch_unwind(AssertUnwindSafe(|| handler.call(&message))) {
                self.bus.publish(
                    Event::new(EventKind::HandlerPanicked)
                        .with_event_name(&message.event)
                        .with_reason(panic_message(&*panic_err)),
                );
            }
            if let Err(panic_err) =
                catch_unwind(AssertUnwindSafe(|| self.hook.after_dispatch(&message)))
            {
                self.bus.publish(
                    Event::new(EventKind::HandlerPanicked)
                        .with_event_name(&message.event)
                        .with_reason(format!("dispatch hook: {}", panic_message(&*panic_err))),
                );
            }
        }
        handlers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Log = Arc<Mutex<Vec<String>>>;

    fn boom(_: &PushMessage) {
        panic!("handler failed");
    }

    fn recording(log: &Log, tag: &'static str) -> crate::core::registry::Handler {
        let log = log.clone();
        Arc::new(move |m: &PushMessage| {
            log.lock().unwrap().push(format!("{tag}:{}", m.event));
        })
    }

    fn dispatcher(registry: Arc<Registry>, hook: Arc<dyn DispatchHook>) -> (Dispatcher, Bus) {
        let bus = Bus::new(64);
        (Dispatcher::new(registry, hook, bus.clone()), bus)
    }

    #[test]
    fn invokes_handlers_in_registration_order() {
        let registry = Arc::new(Registry::new());
        let log: Log = Arc::default();
        registry.insert("fake-event", recording(&log, "h1"));
        registry.insert("fake-event", recording(&log, "h2"));
        registry.insert("fake-event", recording(&log, "h3"));
        registry.insert("other-event", recording(&log, "other"));

        let (d, _bus) = dispatcher(registry, no_hook());
        assert_eq!(d.dispatch(r#"{"event":"fake-event"}"#), 3);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["h1:fake-event", "h2:fake-event", "h3:fake-event"]
        );
    }

    #[test]
    fn handlers_receive_full_payload() {
        let registry = Arc::new(Registry::new());
        let seen = Arc::new(Mutex::new(None));
        let s = seen.clone();
        registry.insert(
            "order",
            Arc::new(move |m: &PushMessage| {
                *s.lock().unwrap() = Some(m.data.clone());
            }),
        );
        let (d, _bus) = dispatcher(registry, no_hook());
        d.dispatch(r#"{"event":"order","id":9,"lines":[1,2]}"#);
        assert_eq!(
            *seen.lock().unwrap(),
            Some(json!({"event": "order", "id": 9, "lines": [1, 2]}))
        );
    }

    #[test]
    fn unknown_event_invokes_nothing() {
        let registry = Arc::new(Registry::new());
        let log: Log = Arc::default();
        registry.insert("fake-event", recording(&log, "h1"));
        let (d, bus) = dispatcher(registry, no_hook());
        let mut rx = bus.subscribe();

        assert_eq!(d.dispatch(r#"{"event":"other-event"}"#), 0);
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(rx.try_recv().unwrap().kind, EventKind::MessageUnhandled);
    }

    #[test]
    fn malformed_payloads_are_dropped() {
        let registry = Arc::new(Registry::new());
        let (d, bus) = dispatcher(registry, no_hook());
        let mut rx = bus.subscribe();

        for raw in ["not json", "[]", r#"{"no":"event"}"#] {
            assert_eq!(d.dispatch(raw), 0);
            assert_eq!(rx.try_recv().unwrap().kind, EventKind::MessageDropped);
        }
    }

    #[test]
    fn hook_runs_after_every_handler() {
        let registry = Arc::new(Registry::new());
        let log: Log = Arc::default();
        registry.insert("e", recording(&log, "h1"));
        registry.insert("e", recording(&log, "h2"));

        let hook_log = log.clone();
        let hook = move |_: &PushMessage| hook_log.lock().unwrap().push("flush".to_string());
        let (d, _bus) = dispatcher(registry, Arc::new(hook));

        d.dispatch(r#"{"event":"e"}"#);
        assert_eq!(*log.lock().unwrap(), vec!["h1:e", "flush", "h2:e", "flush"]);
    }

    #[test]
    fn panicking_handler_does_not_stop_the_rest() {
        let registry = Arc::new(Registry::new());
        let hits = Arc::new(AtomicUsize::new(0));
        registry.insert("e", Arc::new(boom));
        let h = hits.clone();
        registry.insert(
            "e",
            Arc::new(move |_: &PushMessage| {
                h.fetch_add(1, Ordering::SeqCst);
            }),
        );
        let (d, bus) = dispatcher(registry, no_hook());
        let mut rx = bus.subscribe();

        assert_eq!(d.dispatch(r#"{"event":"e"}"#), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        let ev = rx.try_recv().unwrap();
        assert_eq!(ev.kind, EventKind::HandlerPanicked);
        assert_eq!(ev.reason.as_deref(), Some("handler failed"));
    }

    #[test]
    fn handlers_may_mutate_registry_while_dispatching() {
        let registry = Arc::new(Registry::new());
        let inner = registry.clone();
        registry.insert(
            "e",
            Arc::new(move |_: &PushMessage| {
                inner.remove_all("e");
            }),
        );
        let (d, _bus) = dispatcher(registry.clone(), no_hook());
        assert_eq!(d.dispatch(r#"{"event":"e"}"#), 1);
        assert!(!registry.contains("e"));
    }
}
