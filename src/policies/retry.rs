//! # Retry decisions for failed call attempts.
//!
//! A [`RetryPolicy`] is consulted once per failed attempt of a request cell and
//! answers with a [`RetryDecision`]:
//! - `Retry { delay }` → wait `delay`, call again (state stays `Loading`);
//! - `GiveUp { reason }` → the cell settles with `Error { error: reason }`.
//!
//! `None` means "no decision" and is treated as give-up with the original error.
//!
//! ## Context
//! [`RetryContext`] is maintained by the cell, so policies stay pure:
//! ```text
//! attempt 0 ─ fail(timeout) ─► ctx { attempt: 0, timeouts: 1, failures: 0 }
//! attempt 1 ─ fail(boom)    ─► ctx { attempt: 1, timeouts: 1, failures: 1 }
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::error::CallError;

/// Outcome of a retry decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision<E> {
    /// Call again after `delay`.
    Retry {
        /// Pause before the next attempt.
        delay: Duration,
    },
    /// Stop; `reason` becomes the terminal error payload.
    GiveUp {
        /// Terminal error (may differ from the triggering one).
        reason: CallError<E>,
    },
}

/// Per-cell counters handed to [`RetryPolicy::decide`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryContext {
    /// Index of the attempt that just failed (0-based).
    pub attempt: u32,
    /// Timeouts seen by this cell so far, the current one included.
    pub timeouts: u32,
    /// Non-timeout failures seen by this cell so far, the current one included.
    pub failures: u32,
}

impl RetryContext {
    /// Counts `error` against the matching counter.
    pub(crate) fn record<E>(&mut self, error: &CallError<E>) {
        if error.is_timeout() {
            self.timeouts += 1;
        } else {
            self.failures += 1;
        }
    }

    /// Moves on to the next attempt index.
    pub(crate) fn advance(&mut self) {
        self.attempt = self.attempt.saturating_add(1);
    }
}

/// Pure retry decision function.
///
/// # Example
/// ```rust
/// use std::time::Duration;
/// use queryvisor::{CallError, RetryContext, RetryDecision, RetryPolicy};
///
/// struct TwiceThenStop;
///
/// impl RetryPolicy<String> for TwiceThenStop {
///     fn decide(&self, error: &CallError<String>, ctx: &RetryContext) -> Option<RetryDecision<String>> {
///         if ctx.attempt < 2 {
///             Some(RetryDecision::Retry { delay: Duration::ZERO })
///         } else {
///             Some(RetryDecision::GiveUp { reason: error.clone() })
///         }
///     }
/// }
/// ```
pub trait RetryPolicy<E>: Send + Sync + 'static {
    /// Decides what to do after a failed attempt.
    fn decide(&self, error: &CallError<E>, ctx: &RetryContext) -> Option<RetryDecision<E>>;
}

/// Shared handle to a retry policy.
pub type RetryRef<E> = Arc<dyn RetryPolicy<E>>;

/// Single attempt: any failure gives up with the raw error.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

impl<E: Clone + Send + Sync + 'static> RetryPolicy<E> for NoRetry {
    fn decide(&self, error: &CallError<E>, _ctx: &RetryContext) -> Option<RetryDecision<E>> {
        Some(RetryDecision::GiveUp {
            reason: error.clone(),
        })
    }
}

/// Closure-backed retry policy.
///
/// ```rust
/// use std::time::Duration;
/// use queryvisor::{CallError, RetryContext, RetryDecision, RetryFn, RetryRef};
///
/// let policy: RetryRef<String> = RetryFn::arc(|err: &CallError<String>, ctx: &RetryContext| {
///     if ctx.attempt < 3 && !err.is_timeout() {
///         Some(RetryDecision::Retry { delay: Duration::from_millis(50) })
///     } else {
///         Some(RetryDecision::GiveUp { reason: err.clone() })
///     }
/// });
/// # let _ = policy;
/// ```
pub struct RetryFn<F> {
    f: F,
}

impl<F> RetryFn<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Wraps the closure and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

impl<E, F> RetryPolicy<E> for RetryFn<F>
where
    F: Fn(&CallError<E>, &RetryContext) -> Option<RetryDecision<E>> + Send + Sync + 'static,
{
    fn decide(&self, error: &CallError<E>, ctx: &RetryContext) -> Option<RetryDecision<E>> {
        (self.f)(error, ctx)
    }
}

/// Resolves a decision, falling back to give-up with `error` on `None`.
pub(crate) fn decide_or_give_up<E: Clone + 'static>(
    policy: &dyn RetryPolicy<E>,
    error: &CallError<E>,
    ctx: &RetryContext,
) -> RetryDecision<E> {
    policy
        .decide(error, ctx)
        .unwrap_or_else(|| RetryDecision::GiveUp {
            reason: error.clone(),
        })
}
