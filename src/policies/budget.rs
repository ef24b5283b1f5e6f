//! # Separate retry budgets for timeouts and failures.
//!
//! Slow backends and broken requests usually deserve different treatment:
//! a timeout is worth waiting out and trying again a couple of times, a plain
//! failure maybe once right away.
//!
//! ```text
//! timeout #1 ─► retry after timeout_delay
//! timeout #2 ─► retry after timeout_delay
//! timeout #3 ─► give up
//! failure #1 ─► retry after failure_delay
//! failure #2 ─► give up
//! ```

use std::time::Duration;

use crate::error::CallError;
use crate::policies::retry::{RetryContext, RetryDecision, RetryPolicy};

/// Retry policy with independent budgets per error kind.
///
/// Counters come from [`RetryContext`], so budgets are per request cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ErrorBudget {
    /// Timeouts to retry before giving up.
    pub timeout_retries: u32,
    /// Pause before retrying a timed-out call.
    pub timeout_delay: Duration,
    /// Non-timeout failures to retry before giving up.
    pub failure_retries: u32,
    /// Pause before retrying a failed call.
    pub failure_delay: Duration,
}

impl Default for ErrorBudget {
    /// Two timeout retries after 1s, one immediate failure retry.
    fn default() -> Self {
        Self {
            timeout_retries: 2,
            timeout_delay: Duration::from_secs(1),
            failure_retries: 1,
            failure_delay: Duration::ZERO,
        }
    }
}

impl<E: Clone + Send + Sync + 'static> RetryPolicy<E> for ErrorBudget {
    fn decide(&self, error: &CallError<E>, ctx: &RetryContext) -> Option<RetryDecision<E>> {
        let (spent, budget, delay) = if error.is_timeout() {
            (ctx.timeouts, self.timeout_retries, self.timeout_delay)
        } else {
            (ctx.failures, self.failure_retries, self.failure_delay)
        };
        if spent <= budget {
            Some(RetryDecision::Retry { delay })
        } else {
            Some(RetryDecision::GiveUp {
                reason: error.clone(),
            })
        }
    }
}
