//! # Function-backed callee (`CalleeFn`)
//!
//! [`CalleeFn`] wraps a closure `F: Fn(Q) -> Fut`, producing a fresh future per
//! call. Shared state between calls goes through an explicit `Arc<...>`
//! captured by the closure.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use queryvisor::{CalleeFn, CalleeRef};
//!
//! let lookup: CalleeRef<String, String, String> = CalleeFn::arc("lookup", |query: String| async move {
//!     tokio::time::sleep(Duration::from_millis(10)).await;
//!     if query == "111" {
//!         return Err("err!".to_string());
//!     }
//!     Ok(format!("response for {query}"))
//! });
//!
//! assert_eq!(lookup.name(), "lookup");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use crate::callee::callee::{BoxCallFuture, Callee};

/// Function-backed callee implementation.
#[derive(Debug)]
pub struct CalleeFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> CalleeFn<F> {
    /// Creates a new function-backed callee.
    ///
    /// Prefer [`CalleeFn::arc`] when you immediately need a [`CalleeRef`](crate::CalleeRef).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the callee and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<Q, R, E, F, Fut> Callee<Q, R, E> for CalleeFn<F>
where
    F: Fn(Q) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, query: Q) -> BoxCallFuture<R, E> {
        Box::pin((self.f)(query))
    }
}
