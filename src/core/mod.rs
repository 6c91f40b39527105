//! Runtime core: channel lifecycle and dispatch.
//!
//! The public API from this module is [`PushManager`] (with its builder), its
//! [`Config`], and the types its methods hand out.
//!
//! Internal modules:
//! - [`driver`]: the single task owning timers, the transport and connect attempts;
//! - [`runner`]: executes one server call with timeout and event publishing;
//! - [`dispatcher`]: decodes inbound payloads and fans them out to handlers;
//! - [`registry`]: event name → ordered handlers;
//! - [`manager`]: the cloneable handle forwarding commands to the driver.

mod builder;
mod config;
mod dispatcher;
mod driver;
mod manager;
mod registry;
mod runner;
mod status;

pub use builder::PushManagerBuilder;
pub use config::Config;
pub use dispatcher::DispatchHook;
pub use manager::PushManager;
pub use registry::{BoundHandler, Handler};
pub use status::{ConnectionState, ConnectionStatus};
