//! # Exponential backoff retries.
//!
//! [`BackoffPolicy`] computes the delay for a retry from the attempt index:
//! `first × factor^attempt`, clamped to `max`, then jittered. The base delay is
//! derived from the attempt index only, so jitter never feeds back into later
//! delays.
//!
//! [`BackoffRetry`] turns it into a [`RetryPolicy`]: retry up to `max_retries`
//! times, then give up with the last error.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use queryvisor::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(100),
//!     max: Duration::from_secs(10),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.next(0), Duration::from_millis(100));
//! assert_eq!(backoff.next(1), Duration::from_millis(200));
//! // 100ms × 2^10 = 102.4s → capped
//! assert_eq!(backoff.next(10), Duration::from_secs(10));
//! ```

use std::time::Duration;

use crate::error::CallError;
use crate::policies::jitter::JitterPolicy;
use crate::policies::retry::{RetryContext, RetryDecision, RetryPolicy};

/// Delay schedule for retries.
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub first: Duration,
    /// Upper bound for any delay.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Randomization applied to the clamped delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// `first = 100ms`, `factor = 1.0` (constant), `max = 30s`, no jitter.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(100),
            max: Duration::from_secs(30),
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }
}

impl BackoffPolicy {
    /// Delay for the given attempt index (0-based).
    pub fn next(&self, attempt: u32) -> Duration {
        let exp = attempt.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        let base = if !secs.is_finite() || secs < 0.0 || secs > self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        };

        match self.jitter {
            JitterPolicy::Decorrelated => {
                self.jitter
                    .apply_decorrelated(self.first.min(self.max), base, self.max)
            }
            other => other.apply(base),
        }
    }
}

/// Retries any failure with backoff, `max_retries` times at most.
#[derive(Clone, Copy, Debug)]
pub struct BackoffRetry {
    pub backoff: BackoffPolicy,
    /// Retries after the first attempt (`0` behaves like [`NoRetry`](crate::NoRetry)).
    pub max_retries: u32,
}

impl BackoffRetry {
    pub fn new(backoff: BackoffPolicy, max_retries: u32) -> Self {
        Self {
            backoff,
            max_retries,
        }
    }
}

impl<E: Clone + Send + Sync + 'static> RetryPolicy<E> for BackoffRetry {
    fn decide(&self, error: &CallError<E>, ctx: &RetryContext) -> Option<RetryDecision<E>> {
        if ctx.attempt < self.max_retries {
            Some(RetryDecision::Retry {
                delay: self.backoff.next(ctx.attempt),
            })
        } else {
            Some(RetryDecision::GiveUp {
                reason: error.clone(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exponential(jitter: JitterPolicy) -> BackoffPolicy {
        BackoffPolicy {
            first: Duration::from_millis(100),
            max: Duration::from_secs(30),
            factor: 2.0,
            jitter,
        }
    }

    #[test]
    fn test_exponential_growth_no_jitter() {
        let policy = exponential(JitterPolicy::None);
        assert_eq!(policy.next(0), Duration::from_millis(100));
        assert_eq!(policy.next(1), Duration::from_millis(200));
        assert_eq!(policy.next(2), Duration::from_millis(400));
        assert_eq!(policy.next(4), Duration::from_millis(1600));
    }

    #[test]
    fn test_first_exceeds_max() {
        let policy = BackoffPolicy {
            first: Duration::from_secs(10),
            max: Duration::from_secs(5),
            factor: 2.0,
            jitter: JitterPolicy::None,
        };
        assert_eq!(policy.next(0), Duration::from_secs(5));
    }

    #[test]
    fn test_non_finite_overflow_clamps_to_max() {
        let policy = exponential(JitterPolicy::None);
        assert_eq!(policy.next(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn test_full_jitter_never_exceeds_base() {
        let policy = exponential(JitterPolicy::Full);
        for attempt in 0..10 {
            let base = Duration::from_millis(100 * 2u64.pow(attempt));
            assert!(policy.next(attempt) <= base, "attempt {attempt}");
        }
    }

    #[test]
    fn test_retry_budget_then_give_up() {
        let retry = BackoffRetry::new(exponential(JitterPolicy::None), 2);
        let err: CallError<&str> = CallError::Failed("boom");

        let mut ctx = RetryContext::default();
        assert_eq!(
            retry.decide(&err, &ctx),
            Some(RetryDecision::Retry {
                delay: Duration::from_millis(100)
            })
        );
        ctx.attempt = 1;
        assert_eq!(
            retry.decide(&err, &ctx),
            Some(RetryDecision::Retry {
                delay: Duration::from_millis(200)
            })
        );
        ctx.attempt = 2;
        assert_eq!(
            retry.decide(&err, &ctx),
            Some(RetryDecision::GiveUp { reason: err.clone() })
        );
    }
}
