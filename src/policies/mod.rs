//! Reconnect timing policies.
//!
//! ## Contents
//! - [`ReconnectPolicy`] how long to wait before retrying a failed connect
//! - [`JitterPolicy`] randomization strategy to avoid synchronized reconnects
//!
//! ## Quick wiring
//! ```text
//! Config { reconnect: ReconnectPolicy, .. }
//!      └─► core::driver uses reconnect.next(consecutive_failures) to arm the retry timer
//! ```

mod jitter;
mod reconnect;

pub use jitter::JitterPolicy;
pub use reconnect::ReconnectPolicy;
