//! # Built-in subscribers
//!
//! - [`LogWriter`]: renders runtime events through `tracing`.

mod log;

pub use log::LogWriter;
