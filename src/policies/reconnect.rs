//! # Reconnect policy.
//!
//! [`ReconnectPolicy`] decides how long the driver waits before retrying a failed connect
//! for the same subscriber. It is parameterized by:
//! - [`ReconnectPolicy::first`] the delay after the first failure;
//! - [`ReconnectPolicy::factor`] the multiplicative growth per consecutive failure;
//! - [`ReconnectPolicy::max`] the cap;
//! - [`ReconnectPolicy::jitter`] randomization applied to the capped delay.
//!
//! The delay for failure `n` (0-indexed) is `first × factor^n`, clamped to `max`, then
//! jittered. The counter resets on every successful connect.
//!
//! The default is a constant 10s with [`JitterPolicy::Equal`], i.e. a uniform delay in
//! `[5s, 10s]`.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use pushvisor::{JitterPolicy, ReconnectPolicy};
//!
//! let policy = ReconnectPolicy {
//!     first: Duration::from_secs(1),
//!     max: Duration::from_secs(30),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(policy.next(0), Duration::from_secs(1));
//! assert_eq!(policy.next(3), Duration::from_secs(8));
//! assert_eq!(policy.next(10), Duration::from_secs(30));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Reconnect delay policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReconnectPolicy {
    /// Delay after the first failure.
    pub first: Duration,
    /// Maximum delay cap.
    pub max: Duration,
    /// Multiplicative growth factor (`1.0` = constant).
    pub factor: f64,
    /// Jitter applied to the capped delay.
    pub jitter: JitterPolicy,
}

impl Default for ReconnectPolicy {
    /// Returns a policy with:
    /// - `first = max = 10s`, `factor = 1.0` (constant);
    /// - `jitter = Equal` (uniform in 5s..=10s).
    fn default() -> Self {
        Self {
            first: Duration::from_secs(10),
            max: Duration::from_secs(10),
            factor: 1.0,
            jitter: JitterPolicy::Equal,
        }
    }
}

impl ReconnectPolicy {
    /// A constant, jitter-free delay. A zero delay retries immediately.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            first: delay,
            max: delay,
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }

    /// Computes the delay for the given consecutive failure (0-indexed).
    ///
    /// Non-finite or negative intermediate results clamp to [`ReconnectPolicy::max`].
    pub fn next(&self, failure: u32) -> Duration {
        let max_secs = self.max.as_secs_f64();
        let exp = failure.min(i32::MAX as u32) as i32;
        let unclamped_secs = self.first.as_secs_f64() * self.factor.powi(exp);

        let base =
            if !unclamped_secs.is_finite() || unclamped_secs < 0.0 || unclamped_secs > max_secs {
                self.max
            } else {
                Duration::from_secs_f64(unclamped_secs)
            };

        self.jitter.apply(base)
    }
}
