//! Runtime core: query coordination and result sharing.
//!
//! The public API from this module is [`QueryCaller`] (with its builder and
//! [`CallerConfig`]), the [`ResultStream`] it returns, and the [`Replay`]
//! broadcast primitive behind every stream.
//!
//! Internal modules:
//! - [`cell`]: one attempt chain (timeout + retry) for one query;
//! - [`runner`]: executes one attempt with timeout and event publishing;
//! - [`feed`]: follows whichever cell a key slot holds;
//! - [`registry`]: cache registry and uncached resolver;
//! - [`coordinator`]: switches to the latest query with generation tracking;
//! - [`caller`]: wires resolvers, coordinators and subscribers together.

mod builder;
mod caller;
mod cell;
mod config;
mod coordinator;
mod feed;
mod registry;
mod replay;
mod runner;

pub use builder::QueryCallerBuilder;
pub use caller::{QueryCaller, ResultStream};
pub use config::CallerConfig;
pub use replay::{Replay, Subscription};
