//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by request cells, the cache
//! registry and the query coordinator.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `RequestCell`, `runner::call_once`, `CacheRegistry`,
//!   `Coordinator`, `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the caller's subscriber listener (fans out to
//!   [`SubscriberSet`](crate::SubscriberSet)) and raw receivers from
//!   [`QueryCaller::events`](crate::QueryCaller::events).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
