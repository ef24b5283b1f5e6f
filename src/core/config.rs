//! # Caller configuration.
//!
//! Provides [`CallerConfig`], the settings shared by every result stream a
//! [`QueryCaller`](crate::QueryCaller) attaches.
//!
//! ## Sentinel values
//! - `timeout = 0s` → no timeout (the attempt waits for the callee)
//! - `bus_capacity = 0` → clamped to 1

use std::time::Duration;

/// Runtime configuration for a query caller.
///
/// ## Field semantics
/// - `timeout`: Per-attempt timeout (`0s` = no timeout)
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped by Bus)
///
/// All fields are public; prefer the helper accessors over sentinel checks.
#[derive(Clone, Debug)]
pub struct CallerConfig {
    /// Per-attempt timeout.
    ///
    /// - `Duration::ZERO` = no timeout
    /// - `> 0` = an attempt not settled in time fails with `CallError::Timeout`
    ///
    /// Timed-out calls are detached, not aborted.
    pub timeout: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow receivers that lag behind more than `bus_capacity` events receive
    /// `Lagged` and skip older items.
    pub bus_capacity: usize,
}

impl CallerConfig {
    /// Returns the per-attempt timeout as an `Option`.
    ///
    /// - `None` → no timeout
    /// - `Some(d)` → timeout applied per attempt
    #[inline]
    pub fn default_timeout(&self) -> Option<Duration> {
        if self.timeout == Duration::ZERO {
            None
        } else {
            Some(self.timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for CallerConfig {
    /// Default configuration:
    ///
    /// - `timeout = 0s` (no timeout)
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            timeout: Duration::ZERO,
            bus_capacity: 1024,
        }
    }
}
