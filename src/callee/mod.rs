//! # Callee abstractions.
//!
//! This module provides the opaque async operation driven by the runtime:
//! - [`Callee`] - trait for an async `query → response` operation
//! - [`CalleeFn`] - closure-backed implementation
//! - [`CalleeRef`] - shared reference to a callee (`Arc<dyn Callee<..>>`)

mod callee;
mod callee_fn;

pub use callee::{BoxCallFuture, Callee, CalleeRef};
pub use callee_fn::CalleeFn;
