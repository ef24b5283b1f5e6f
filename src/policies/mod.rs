//! Retry policies.
//!
//! This module groups the knobs that control **whether** a failed call attempt
//! is retried and **how long** to wait before the next one.
//!
//! ## Contents
//! - [`RetryPolicy`]  the decision contract (`decide(error, ctx)`)
//! - [`NoRetry`]      single attempt (default)
//! - [`RetryFn`]      closure-backed policy
//! - [`BackoffRetry`] fixed retry count with [`BackoffPolicy`] delays
//! - [`ErrorBudget`]  separate budgets for timeouts and failures
//! - [`JitterPolicy`] randomization of backoff delays
//!
//! ## Quick wiring
//! ```text
//! QueryCaller::builder(callee).retry(policy)
//!      └─► core::cell::RequestCell uses:
//!           - policy.decide(error, ctx) after each failed attempt
//!           - Retry { delay } → sleep, call again (state stays Loading)
//!           - GiveUp { reason } → Error { reason }
//! ```

mod backoff;
mod budget;
mod jitter;
mod retry;

pub use backoff::{BackoffPolicy, BackoffRetry};
pub use budget::ErrorBudget;
pub use jitter::JitterPolicy;
pub use retry::{NoRetry, RetryContext, RetryDecision, RetryFn, RetryPolicy, RetryRef};

pub(crate) use retry::decide_or_give_up;
