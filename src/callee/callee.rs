//! # Callee: the opaque async operation behind every query.
//!
//! A callee receives a query and yields exactly one eventual outcome. It has no
//! cancellation hook: the runtime spawns each call as its own tokio task, and
//! losing interest in a result (timeout, query switch, invalidation) only stops
//! observing it. The call itself runs to completion.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by [`Callee::call`].
pub type BoxCallFuture<R, E> = Pin<Box<dyn Future<Output = Result<R, E>> + Send + 'static>>;

/// # Asynchronous `query → response` operation.
///
/// # Example
/// ```
/// use queryvisor::{BoxCallFuture, Callee};
///
/// struct Echo;
///
/// impl Callee<String, String, String> for Echo {
///     fn name(&self) -> &str { "echo" }
///
///     fn call(&self, query: String) -> BoxCallFuture<String, String> {
///         Box::pin(async move { Ok(format!("response for {query}")) })
///     }
/// }
/// ```
pub trait Callee<Q, R, E>: Send + Sync + 'static {
    /// Returns a stable, human-readable name used in runtime events.
    fn name(&self) -> &str;

    /// Starts one call for `query`.
    ///
    /// The returned future is spawned; it must own everything it needs.
    fn call(&self, query: Q) -> BoxCallFuture<R, E>;
}

/// Shared handle to a callee.
pub type CalleeRef<Q, R, E> = Arc<dyn Callee<Q, R, E>>;
