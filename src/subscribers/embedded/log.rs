//! # LogWriter: runtime events as `tracing` records
//!
//! A minimal subscriber that renders incoming [`Event`]s through `tracing`, at a level
//! matching their severity: failures at `warn`, lifecycle at `info`, chatter at `debug`.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO  pushvisor: connect-starting subscriber="Qe2...": attempt=1
//! WARN  pushvisor: connect-failed subscriber="Qe2..." err="unavailable: dns"
//! INFO  pushvisor: reconnect-scheduled subscriber="Qe2..." delay_ms=7311 attempt=1
//! INFO  pushvisor: connected subscriber="Qe2..." attempt=2
//! DEBUG pushvisor: keep-alive-sent subscriber="Qe2..."
//! WARN  pushvisor: transport-failed subscriber="Qe2..." err="socket reset"
//! ```

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

const TARGET: &str = "pushvisor";

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let sub = e.subscriber.as_deref().unwrap_or("-");
        let name = e.event_name.as_deref().unwrap_or("-");
        let err = e.reason.as_deref().unwrap_or("-");

        match e.kind {
            EventKind::ConnectStarting => {
                info!(target: TARGET, subscriber = sub, attempt = ?e.attempt, "connect-starting");
            }
            EventKind::Connected => {
                info!(target: TARGET, subscriber = sub, attempt = ?e.attempt, "connected");
            }
            EventKind::ConnectFailed => {
                warn!(target: TARGET, subscriber = sub, err, "connect-failed");
            }
            EventKind::ConnectSuperseded => {
                debug!(target: TARGET, subscriber = sub, attempt = ?e.attempt, "connect-superseded");
            }
            EventKind::ReconnectScheduled => {
                info!(
                    target: TARGET,
                    subscriber = sub,
                    delay_ms = ?e.delay_ms,
                    attempt = ?e.attempt,
                    err,
                    "reconnect-scheduled"
                );
            }
            EventKind::TransportFailed => {
                warn!(target: TARGET, subscriber = sub, err, "transport-failed");
            }
            EventKind::KeepAliveSent => {
                debug!(target: TARGET, subscriber = sub, "keep-alive-sent");
            }
            EventKind::KeepAliveFailed => {
                warn!(target: TARGET, subscriber = sub, err, "keep-alive-failed");
            }
            EventKind::BindSent => {
                debug!(target: TARGET, subscriber = sub, event = name, "bind-sent");
            }
            EventKind::UnbindSent => {
                debug!(target: TARGET, subscriber = sub, event = name, "unbind-sent");
            }
            EventKind::BindFailed => {
                warn!(target: TARGET, subscriber = sub, event = name, err, "bind-failed");
            }
            EventKind::UnbindFailed => {
                warn!(target: TARGET, subscriber = sub, event = name, err, "unbind-failed");
            }
            EventKind::NotifySkipped => {
                debug!(target: TARGET, event = name, err, "notify-skipped");
            }
            EventKind::HandlersCleared => {
                debug!(target: TARGET, event = name, note = err, "handlers-cleared");
            }
            EventKind::MessageDropped => {
                warn!(target: TARGET, err, "message-dropped");
            }
            EventKind::MessageUnhandled => {
                debug!(target: TARGET, event = name, "message-unhandled");
            }
            EventKind::HandlerPanicked => {
                warn!(target: TARGET, event = name, info = err, "handler-panicked");
            }
            EventKind::SubscriberOverflow => {
                warn!(target: TARGET, info = err, "subscriber-overflow");
            }
            EventKind::SubscriberPanicked => {
                warn!(target: TARGET, info = err, "subscriber-panicked");
            }
            EventKind::ShutdownRequested => {
                info!(target: TARGET, "shutdown-requested");
            }
            EventKind::Stopped => {
                info!(target: TARGET, "stopped");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn renders_every_kind_without_a_collector() {
        let writer = LogWriter::new();
        for kind in [
            EventKind::ConnectStarting,
            EventKind::ConnectFailed,
            EventKind::ReconnectScheduled,
            EventKind::MessageDropped,
            EventKind::Stopped,
        ] {
            writer
                .on_event(&Event::new(kind).with_subscriber("s").with_reason("r"))
                .await;
        }
        assert_eq!(writer.name(), "LogWriter");
    }
}
