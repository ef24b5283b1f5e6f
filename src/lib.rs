//! # queryvisor
//!
//! **Queryvisor** turns a changing stream of query values into a stream of
//! typed result states, driving one opaque async operation (the *callee*).
//!
//! Compared to calling the operation directly, callers get:
//! - an observable lifecycle (`Loading` → `Success` / `Error`) for every query;
//! - per-key result sharing: queries with the same cache key reuse in-flight
//!   or completed work;
//! - pluggable timeout and retry policies that recover transient failures
//!   without intermediate error states;
//! - out-of-band invalidation that re-runs a key while its followers
//!   transparently receive the new lifecycle.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   query stream                       invalidation stream
//!        │                                     │
//!        ▼                                     ▼
//! ┌──────────────────┐  resolve(q)  ┌───────────────────────────────┐
//! │   Coordinator    │─────────────►│ CacheRegistry (or Uncached)   │
//! │ (switch-to-latest│◄─── Feed ────│ key ─► Replay<CellRef> slot   │
//! │  by generation)  │              └──────────────┬────────────────┘
//! └────────┬─────────┘                             │ creates / replaces
//!          │ publish_if_current                    ▼
//!          ▼                              ┌─────────────────┐
//!   Replay<ResultState> ◄─── states ──────│  RequestCell    │
//!   (ResultStream)                        │ timeout + retry │──► Callee
//!                                         └─────────────────┘
//!
//! cells / registry / coordinator ── Event ──► Bus ──► SubscriberSet ──► LogWriter, ...
//! ```
//!
//! ### Cell lifecycle
//! ```text
//! first subscription ──► Loading
//! loop {
//!   ├─► call_once(query, timeout)
//!   │     ├─ Ok  ──► Success, exit
//!   │     └─ Err ──► policy.decide(error, ctx)
//!   │                 ├─ Retry{ delay } ─► sleep, attempt += 1 (still Loading)
//!   │                 ├─ GiveUp{ reason } ─► Error{ reason }, exit
//!   │                 └─ None ─► Error{ original error }, exit
//! }
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                          |
//! |-------------------|----------------------------------------------------------|---------------------------------------------|
//! | **Caller**        | Attach query streams, get multicast result streams.      | [`QueryCaller`], [`ResultStream`]           |
//! | **Callees**       | The opaque async operation, as trait or closure.         | [`Callee`], [`CalleeFn`], [`CalleeRef`]     |
//! | **Policies**      | Decide on retries after failed attempts.                 | [`RetryPolicy`], [`ErrorBudget`], [`BackoffRetry`] |
//! | **States**        | Lifecycle of one query.                                  | [`ResultState`], [`CallError`]              |
//! | **Subscriber API**| Hook into runtime events (logging, metrics, custom).     | [`Subscribe`], [`Event`]                    |
//! | **Configuration** | Centralize runtime settings.                             | [`CallerConfig`]                            |
//!
//! ## Optional features
//! - `logging` (default): exports the `tracing`-backed [`LogWriter`].
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use futures::StreamExt;
//! use queryvisor::{CalleeFn, CalleeRef, QueryCaller, ResultState};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let lookup: CalleeRef<u32, String, String> = CalleeFn::arc("lookup", |id: u32| async move {
//!         tokio::time::sleep(Duration::from_millis(10)).await;
//!         Ok::<_, String>(format!("user #{id}"))
//!     });
//!
//!     let caller = QueryCaller::builder(lookup)
//!         .cache_key(|id: &u32| id.to_string())
//!         .build()?;
//!
//!     let results = caller.watch(futures::stream::iter([7u32]))?;
//!     let mut states = results.subscribe();
//!
//!     assert_eq!(states.next().await, Some(ResultState::Loading { query: 7 }));
//!     let done = states.next().await.expect("terminal state");
//!     assert_eq!(done.response().map(String::as_str), Some("user #7"));
//!     Ok(())
//! }
//! ```
mod callee;
mod core;
mod error;
mod events;
mod policies;
mod state;
mod subscribers;

// ---- Public re-exports ----

pub use callee::{BoxCallFuture, Callee, CalleeFn, CalleeRef};
pub use core::{CallerConfig, QueryCaller, QueryCallerBuilder, Replay, ResultStream, Subscription};
pub use error::{CallError, CallerError};
pub use events::{Bus, Event, EventKind};
pub use policies::{
    BackoffPolicy, BackoffRetry, ErrorBudget, JitterPolicy, NoRetry, RetryContext, RetryDecision,
    RetryFn, RetryPolicy, RetryRef,
};
pub use state::{Payload, ResultState};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose the built-in tracing subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
