//! # LogWriter: event renderer over `tracing`
//!
//! A subscriber that turns runtime [`Event`]s into `tracing` records. Install any
//! `tracing` subscriber (e.g. `tracing_subscriber::fmt`) to see them.
//!
//! ## Example output
//! ```text
//! DEBUG queryvisor: cell created key="111" cell=3 callee="search"
//! DEBUG queryvisor: call starting key="111" cell=3 attempt=0
//!  WARN queryvisor: call timed out key="111" cell=3 attempt=0 timeout_ms=1500
//!  INFO queryvisor: retry scheduled key="111" cell=3 attempt=0 delay_ms=1000
//!  WARN queryvisor: gave up key="111" cell=3 attempt=2 reason="timed out after 1.5s"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let key = e.key.as_deref();
        match e.kind {
            EventKind::CellCreated => {
                tracing::debug!(target: "queryvisor", ?key, cell = ?e.cell, callee = ?e.callee, "cell created");
            }
            EventKind::CallStarting => {
                tracing::debug!(target: "queryvisor", ?key, cell = ?e.cell, attempt = ?e.attempt, "call starting");
            }
            EventKind::CallSucceeded => {
                tracing::debug!(target: "queryvisor", ?key, cell = ?e.cell, attempt = ?e.attempt, "call succeeded");
            }
            EventKind::CallFailed => {
                tracing::warn!(target: "queryvisor", ?key, cell = ?e.cell, attempt = ?e.attempt, reason = ?e.reason, "call failed");
            }
            EventKind::TimeoutHit => {
                tracing::warn!(target: "queryvisor", ?key, cell = ?e.cell, attempt = ?e.attempt, timeout_ms = ?e.timeout_ms, "call timed out");
            }
            EventKind::RetryScheduled => {
                tracing::info!(target: "queryvisor", ?key, cell = ?e.cell, attempt = ?e.attempt, delay_ms = ?e.delay_ms, "retry scheduled");
            }
            EventKind::GaveUp => {
                tracing::warn!(target: "queryvisor", ?key, cell = ?e.cell, attempt = ?e.attempt, reason = ?e.reason, "gave up");
            }
            EventKind::LateResultDiscarded => {
                tracing::debug!(target: "queryvisor", ?key, cell = ?e.cell, attempt = ?e.attempt, "late result discarded");
            }
            EventKind::CacheHit => {
                tracing::trace!(target: "queryvisor", ?key, cell = ?e.cell, state = ?e.reason, "cache hit");
            }
            EventKind::CacheInvalidated => {
                tracing::info!(target: "queryvisor", ?key, cell = ?e.cell, "cache invalidated");
            }
            EventKind::InvalidationIgnored => {
                tracing::debug!(target: "queryvisor", ?key, "invalidation ignored, key unseen");
            }
            EventKind::QuerySwitched => {
                tracing::trace!(target: "queryvisor", ?key, generation = ?e.generation, "query switched");
            }
            EventKind::StaleResultDropped => {
                tracing::trace!(target: "queryvisor", generation = ?e.generation, "stale result dropped");
            }
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
                tracing::warn!(target: "queryvisor", kind = ?e.kind, reason = ?e.reason, "subscriber trouble");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
