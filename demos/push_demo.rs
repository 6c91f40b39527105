//! # Demo: push_demo
//!
//! Drives a [`PushManager`] against the in-memory server doubles and prints what happens.
//!
//! Shows how to:
//! - Bind handlers before the channel is open (they are announced once connected).
//! - Observe the lifecycle through [`LogWriter`] and a custom [`Subscribe`] implementation.
//! - Survive a rejected connect and a transport reset.
//!
//! ## Flow
//! ```text
//! bind("order-created") ──► NotifySkipped (no subscriber yet)
//! open_connection(None) ──► connect ✗ rejected ──► ReconnectScheduled (1s)
//!                       ──► connect ✓ ──► Transport::open ──► Connected ──► bind(s, "order-created")
//! push(order-created)   ──► handler + dispatch hook
//! fail(token)           ──► TransportFailed ──► connect ✓ ──► Connected
//! shutdown()            ──► ShutdownRequested ──► Stopped
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=pushvisor=debug cargo run --example push_demo --features testing
//! ```

use std::{sync::Arc, time::Duration};

use pushvisor::{
    ChannelError, Config, Event, EventKind, LogWriter, PushManager, PushMessage, Subscribe,
    testing::{MemoryTransport, RecordingMethods},
};
use tracing_subscriber::EnvFilter;

/// Prints connection transitions only.
struct Transitions;

#[async_trait::async_trait]
impl Subscribe for Transitions {
    async fn on_event(&self, ev: &Event) {
        match ev.kind {
            EventKind::Connected => println!(
                "[demo] connected as {}",
                ev.subscriber.as_deref().unwrap_or("<unknown>")
            ),
            EventKind::TransportFailed => println!(
                "[demo] transport lost: {}",
                ev.reason.as_deref().unwrap_or("<none>")
            ),
            EventKind::ReconnectScheduled => println!(
                "[demo] retrying in {}ms",
                ev.delay_ms.unwrap_or_default()
            ),
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "transitions"
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pushvisor=info")),
        )
        .init();

    let methods = RecordingMethods::new();
    let transport = MemoryTransport::new();
    methods.fail_next_connect(ChannelError::rejected("server warming up"));

    let cfg = Config::default()
        .with_keep_alive_seconds(2)
        .with_reconnect_seconds(1);

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new()), Arc::new(Transitions)];
    let pm = PushManager::builder(cfg, methods.clone(), transport.clone())
        .with_subscribers(subs)
        .with_hook(|msg: &PushMessage| println!("[demo] refresh after {}", msg.event))
        .build();

    pm.bind("order-created", |msg: &PushMessage| {
        println!("[demo] order created: id={:?}", msg.get("id"));
    });

    let subscriber = pm.open_connection(None);
    let token = format!("token-{subscriber}");
    println!("[demo] subscriber {subscriber}");

    let mut status = pm.watch_status();
    while !status.borrow_and_update().is_connected() {
        if status.changed().await.is_err() {
            return;
        }
    }

    transport.push(&token, r#"{"event":"order-created","id":42}"#);
    transport.push(&token, r#"{"event":"unknown-event"}"#);
    tokio::time::sleep(Duration::from_millis(2500)).await;

    transport.fail(&token, "connection reset by peer");
    tokio::time::sleep(Duration::from_millis(200)).await;

    pm.shutdown().await;
    println!("[demo] server calls: {:?}", methods.calls());
}
