//! # Feed: follow whichever cell a key slot currently holds.
//!
//! A [`Feed`] subscribes once to a per-key slot (`Replay<CellRef>`) and
//! forwards the states of the cell held there. When an invalidation publishes
//! a new cell into the slot, the feed drops the old cell's remaining states and
//! continues from the new cell's `Loading`.
//!
//! ```text
//! slot: [cell A] ───────────── publish(cell B) ────────────►
//! feed:  A.Loading, A.Success   │  B.Loading, B.Success
//!                               └─ switch, A is no longer observed
//! ```
//!
//! The feed ends once the slot is gone and the followed cell has no more states.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;

use crate::core::cell::CellRef;
use crate::core::replay::{Replay, Subscription};
use crate::state::{Payload, ResultState};

/// Stream of states for one key (or one uncached cell), following replacements.
pub(crate) struct Feed<Q, R, E> {
    cells: Option<Subscription<CellRef<Q, R, E>>>,
    states: Option<Subscription<ResultState<Q, R, E>>>,
    key: Option<Arc<str>>,
}

impl<Q: Payload, R: Payload, E: Payload + std::fmt::Display> Feed<Q, R, E> {
    /// Follows the cells published into `slot`.
    pub fn follow(slot: &Replay<CellRef<Q, R, E>>, key: Option<Arc<str>>) -> Self {
        Self {
            cells: Some(slot.subscribe()),
            states: None,
            key,
        }
    }

    /// Follows a single cell that will never be replaced.
    pub fn single(cell: CellRef<Q, R, E>) -> Self {
        Self::follow(&Replay::with_latest(cell), None)
    }

    /// Cache key of the followed slot (`None` when uncached).
    pub fn key(&self) -> Option<&Arc<str>> {
        self.key.as_ref()
    }
}

impl<Q: Payload, R: Payload, E: Payload + std::fmt::Display> Stream for Feed<Q, R, E> {
    type Item = ResultState<Q, R, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        while let Some(cells) = this.cells.as_mut() {
            match cells.poll_recv(cx) {
                Poll::Ready(Some(cell)) => this.states = Some(cell.subscribe()),
                Poll::Ready(None) => this.cells = None,
                Poll::Pending => break,
            }
        }

        if let Some(states) = this.states.as_mut() {
            match states.poll_recv(cx) {
                Poll::Ready(Some(state)) => return Poll::Ready(Some(state)),
                Poll::Ready(None) => this.states = None,
                Poll::Pending => {}
            }
        }

        if this.cells.is_none() && this.states.is_none() {
            Poll::Ready(None)
        } else {
            Poll::Pending
        }
    }
}
