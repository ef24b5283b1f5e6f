//! # Runtime events emitted by request cells, the registry and the coordinator.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Call events**: one attempt chain (starting, succeeded, failed, timeout, retry, give-up)
//! - **Cache events**: registry bookkeeping (created, hit, invalidated)
//! - **Switch events**: the coordinator following the latest query
//! - **Subscriber events**: overflow and panic reports from the fan-out
//!
//! The [`Event`] struct carries optional metadata: cache key, cell id, attempt,
//! delays and a human-readable reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use queryvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::RetryScheduled)
//!     .with_key("user:42")
//!     .with_attempt(1)
//!     .with_delay(Duration::from_millis(250))
//!     .with_reason("timed out after 1s");
//!
//! assert_eq!(ev.kind, EventKind::RetryScheduled);
//! assert_eq!(ev.key.as_deref(), Some("user:42"));
//! assert_eq!(ev.delay_ms, Some(250));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Call events ===
    /// A request cell was built (first lookup of a key, invalidation, or uncached query).
    ///
    /// Sets: `cell`, `key` (cached only), `callee`
    CellCreated,

    /// A call attempt is starting.
    ///
    /// Sets: `cell`, `key`, `callee`, `attempt` (0-based)
    CallStarting,

    /// The callee settled with a response; the cell is now `Success`.
    ///
    /// Sets: `cell`, `key`, `callee`, `attempt`
    CallSucceeded,

    /// An attempt failed (callee error, panic, or timeout).
    ///
    /// Sets: `cell`, `key`, `callee`, `attempt`, `reason`
    CallFailed,

    /// An attempt exceeded the configured timeout (always followed by `CallFailed`).
    ///
    /// Sets: `cell`, `key`, `callee`, `attempt`, `timeout_ms`
    TimeoutHit,

    /// The retry policy scheduled another attempt.
    ///
    /// Sets: `cell`, `key`, `callee`, `attempt` (the failed one), `delay_ms`, `reason`
    RetryScheduled,

    /// The retry policy gave up; the cell is now `Error`.
    ///
    /// Sets: `cell`, `key`, `callee`, `attempt`, `reason`
    GaveUp,

    /// A callee settled after its attempt had already timed out; the outcome was dropped.
    ///
    /// Sets: `cell`, `key`, `callee`, `attempt`
    LateResultDiscarded,

    // === Cache events ===
    /// A query was served from an existing registry entry.
    ///
    /// Sets: `key`, `cell` (the active one), `attempt`, `reason` (state label: in flight or settled)
    CacheHit,

    /// An invalidation swapped the active cell of a key.
    ///
    /// Sets: `key`, `cell` (the new one)
    CacheInvalidated,

    /// An invalidation targeted a key with no history; nothing happened.
    ///
    /// Sets: `key`
    InvalidationIgnored,

    // === Switch events ===
    /// The coordinator switched to a new query.
    ///
    /// Sets: `generation`, `key` (cached only)
    QuerySwitched,

    /// A state from a superseded generation reached the coordinator and was dropped.
    ///
    /// Sets: `generation` (the stale one)
    StaleResultDropped,

    // === Subscriber events ===
    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `reason` (`subscriber=<name> reason=<full|closed>`)
    SubscriberOverflow,

    /// Subscriber panicked during event processing.
    ///
    /// Sets: `reason` (panic info)
    SubscriberPanicked,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Cache key, if the event concerns a registry entry.
    pub key: Option<Arc<str>>,
    /// Request cell id (unique per caller process).
    pub cell: Option<u64>,
    /// Callee name.
    pub callee: Option<Arc<str>>,
    /// Attempt index within the cell (0-based).
    pub attempt: Option<u32>,
    /// Coordinator generation.
    pub generation: Option<u64>,
    /// Attempt timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Retry delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            key: None,
            cell: None,
            callee: None,
            attempt: None,
            generation: None,
            timeout_ms: None,
            delay_ms: None,
            reason: None,
        }
    }

    #[inline]
    pub fn with_key(mut self, key: impl Into<Arc<str>>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Attaches the key when there is one (uncached cells have none).
    #[inline]
    pub fn with_key_opt(mut self, key: Option<&Arc<str>>) -> Self {
        self.key = key.cloned();
        self
    }

    #[inline]
    pub fn with_cell(mut self, id: u64) -> Self {
        self.cell = Some(id);
        self
    }

    #[inline]
    pub fn with_callee(mut self, name: impl Into<Arc<str>>) -> Self {
        self.callee = Some(name.into());
        self
    }

    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    #[inline]
    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = Some(generation);
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(compact_ms(d));
        self
    }

    /// Attaches a retry delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(compact_ms(d));
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} info={info}"))
    }

    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}

fn compact_ms(d: Duration) -> u32 {
    d.as_millis().min(u128::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic() {
        let a = Event::new(EventKind::CallStarting);
        let b = Event::new(EventKind::CallSucceeded);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn durations_are_stored_compact() {
        let ev = Event::new(EventKind::TimeoutHit).with_timeout(Duration::from_secs(u64::MAX));
        assert_eq!(ev.timeout_ms, Some(u32::MAX));
    }

    #[test]
    fn overflow_reason_names_the_subscriber() {
        let ev = Event::subscriber_overflow("metrics", "full");
        assert!(ev.is_subscriber_event());
        assert_eq!(ev.reason.as_deref(), Some("subscriber=metrics reason=full"));
    }
}
