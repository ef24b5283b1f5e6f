//! # RequestCell: one attempt chain for one query.
//!
//! A cell wraps the callee with the configured timeout and retry policy and
//! exposes the chain's [`ResultState`]s through a [`Replay`] point.
//!
//! ## Lifecycle
//! ```text
//! new() ─► state = Loading (not started)
//! subscribe() ─► first subscriber starts run() (once per cell)
//!
//! loop {
//!   ├─► publish CallStarting{ attempt }
//!   ├─► call_once(query, timeout, attempt)
//!   │       ├─ Ok(response) ─► state = Success, exit
//!   │       └─ Err(error)   ─► ctx.record(error)
//!   │                          policy.decide(error, ctx)
//!   │                            ├─ Retry{ delay } ─► publish RetryScheduled
//!   │                            │                   sleep(delay), attempt += 1
//!   │                            └─ GiveUp{ reason } ─► state = Error, exit
//! }
//! ```
//!
//! ## Rules
//! - Cold start, hot replay: the callee chain starts on the first subscription,
//!   never twice; later subscribers get the latest state immediately.
//! - Retries are silent: the state stays `Loading` until the terminal state.
//! - Terminal states are final; a refresh is a new cell.
//! - A superseded cell is never stopped, it finishes unobserved.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use tokio::time;

use crate::callee::CalleeRef;
use crate::core::replay::{Replay, Subscription};
use crate::core::runner::call_once;
use crate::events::{Bus, Event, EventKind};
use crate::policies::{RetryContext, RetryDecision, RetryRef, decide_or_give_up};
use crate::state::{Payload, ResultState};

/// Source of unique cell ids (for events only).
static CELL_SEQ: AtomicU64 = AtomicU64::new(1);

pub(crate) type CellRef<Q, R, E> = Arc<RequestCell<Q, R, E>>;

/// Execution parameters shared by every cell of one caller.
pub(crate) struct CallPlan<Q, R, E> {
    /// Operation to call.
    pub callee: CalleeRef<Q, R, E>,
    /// Decides on retries after failed attempts.
    pub retry: RetryRef<E>,
    /// Optional per-attempt timeout (`None` = wait for the callee).
    pub timeout: Option<Duration>,
    /// Internal event bus.
    pub bus: Bus,
}

impl<Q: Payload, R: Payload, E: Payload + std::fmt::Display> CallPlan<Q, R, E> {
    /// Builds a new, not yet started cell for `query`.
    pub fn cell(self: &Arc<Self>, query: Q, key: Option<Arc<str>>) -> CellRef<Q, R, E> {
        let scope = EventScope {
            cell: CELL_SEQ.fetch_add(1, Ordering::Relaxed),
            key,
            callee: Arc::from(self.callee.name()),
        };
        self.bus.publish(scope.event(EventKind::CellCreated));

        Arc::new(RequestCell {
            states: Replay::with_latest(ResultState::Loading {
                query: query.clone(),
            }),
            query,
            scope,
            plan: Arc::clone(self),
            started: AtomicBool::new(false),
            attempt: AtomicU32::new(0),
        })
    }
}

/// Identity of a cell as it appears in events.
#[derive(Clone, Debug)]
pub(crate) struct EventScope {
    pub cell: u64,
    pub key: Option<Arc<str>>,
    pub callee: Arc<str>,
}

impl EventScope {
    pub fn event(&self, kind: EventKind) -> Event {
        Event::new(kind)
            .with_cell(self.cell)
            .with_key_opt(self.key.as_ref())
            .with_callee(Arc::clone(&self.callee))
    }
}

/// One attempt chain (initial call + retries) for a single query.
pub(crate) struct RequestCell<Q, R, E> {
    query: Q,
    scope: EventScope,
    plan: Arc<CallPlan<Q, R, E>>,
    states: Replay<ResultState<Q, R, E>>,
    started: AtomicBool,
    attempt: AtomicU32,
}

impl<Q: Payload, R: Payload, E: Payload + std::fmt::Display> RequestCell<Q, R, E> {
    pub fn id(&self) -> u64 {
        self.scope.cell
    }

    /// Current attempt index.
    pub fn attempt(&self) -> u32 {
        self.attempt.load(Ordering::Relaxed)
    }

    /// Latest state; `Loading` until the chain settles.
    pub fn latest(&self) -> ResultState<Q, R, E> {
        self.states
            .latest()
            .unwrap_or_else(|| ResultState::Loading {
                query: self.query.clone(),
            })
    }

    /// Attaches an observer and starts the chain if this is the first one.
    ///
    /// Must be called inside a tokio runtime.
    pub fn subscribe(self: &Arc<Self>) -> Subscription<ResultState<Q, R, E>> {
        let sub = self.states.subscribe();
        if !self.started.swap(true, Ordering::AcqRel) {
            tokio::spawn(Arc::clone(self).run());
        }
        sub
    }

    /// Drives the attempt chain to its terminal state.
    async fn run(self: Arc<Self>) {
        let bus = &self.plan.bus;
        let mut ctx = RetryContext::default();

        loop {
            self.attempt.store(ctx.attempt, Ordering::Relaxed);
            bus.publish(
                self.scope
                    .event(EventKind::CallStarting)
                    .with_attempt(ctx.attempt),
            );

            let res = call_once(
                &self.plan.callee,
                self.query.clone(),
                self.plan.timeout,
                ctx.attempt,
                &self.scope,
                bus,
            )
            .await;

            let error = match res {
                Ok(response) => {
                    bus.publish(
                        self.scope
                            .event(EventKind::CallSucceeded)
                            .with_attempt(ctx.attempt),
                    );
                    self.settle(ResultState::Success {
                        query: self.query.clone(),
                        response,
                    });
                    return;
                }
                Err(error) => error,
            };

            ctx.record(&error);
            match decide_or_give_up(self.plan.retry.as_ref(), &error, &ctx) {
                RetryDecision::Retry { delay } => {
                    bus.publish(
                        self.scope
                            .event(EventKind::RetryScheduled)
                            .with_attempt(ctx.attempt)
                            .with_delay(delay)
                            .with_reason(error.to_string()),
                    );
                    time::sleep(delay).await;
                    ctx.advance();
                }
                RetryDecision::GiveUp { reason } => {
                    bus.publish(
                        self.scope
                            .event(EventKind::GaveUp)
                            .with_attempt(ctx.attempt)
                            .with_reason(reason.to_string()),
                    );
                    self.settle(ResultState::Error {
                        query: self.query.clone(),
                        error: reason,
                    });
                    return;
                }
            }
        }
    }

    fn settle(&self, state: ResultState<Q, R, E>) {
        self.states.publish(state);
    }
}
