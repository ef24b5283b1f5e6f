//! Error types used by the queryvisor runtime and callees.
//!
//! This module defines two main error enums:
//!
//! - [`CallerError`]: errors raised by the caller runtime itself (construction, lifecycle).
//! - [`CallError`]: failures of a single call attempt, carried as data inside
//!   [`ResultState::Error`](crate::ResultState::Error).
//!
//! Both types provide `as_label` for logging/metrics.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the queryvisor runtime.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallerError {
    /// The builder was used outside of a tokio runtime.
    #[error("no tokio runtime is available to drive calls")]
    NoRuntime,

    /// The caller was closed; no new result streams can be attached.
    #[error("caller is closed")]
    Closed,
}

impl CallerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use queryvisor::CallerError;
    ///
    /// assert_eq!(CallerError::Closed.as_label(), "caller_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            CallerError::NoRuntime => "caller_no_runtime",
            CallerError::Closed => "caller_closed",
        }
    }
}

/// # Failure of one call attempt.
///
/// `E` is the callee's own error type; the runtime never interprets it.
/// Retry policies receive a `&CallError<E>` and may pick any `CallError<E>`
/// as the give-up reason.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError<E> {
    /// The callee did not settle within the configured timeout.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// The callee settled with a failure.
    #[error("callee failed: {0}")]
    Failed(E),

    /// The callee task panicked before settling.
    #[error("callee panicked: {message}")]
    Panicked {
        /// Panic payload rendered as text, when available.
        message: String,
    },
}

impl<E> CallError<E> {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use queryvisor::CallError;
    /// use std::time::Duration;
    ///
    /// let err: CallError<String> = CallError::Timeout { timeout: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "call_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            CallError::Timeout { .. } => "call_timeout",
            CallError::Failed(_) => "call_failed",
            CallError::Panicked { .. } => "call_panicked",
        }
    }

    /// True for synthesized timeouts.
    pub fn is_timeout(&self) -> bool {
        matches!(self, CallError::Timeout { .. })
    }

    /// Returns the callee's own error, if this is a [`CallError::Failed`].
    pub fn failure(&self) -> Option<&E> {
        match self {
            CallError::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Renders a panic payload (`&str` or `String`) as text.
pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
