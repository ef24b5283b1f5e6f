//! # Event subscribers for the queryvisor runtime.
//!
//! This module provides the [`Subscribe`] trait and built-in implementations
//! for handling runtime events broadcast through the [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   RequestCell ── publish(Event) ──► Bus ──► subscriber_listener ──► SubscriberSet
//!                                                                    │
//!                                                        ┌───────────┼──────────┐
//!                                                        ▼           ▼          ▼
//!                                                    LogWriter    Metrics    Custom
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use queryvisor::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct CacheStats;
//!
//! #[async_trait]
//! impl Subscribe for CacheStats {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::CacheHit {
//!             // increment hit counter
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "cache-stats" }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscriber;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
