//! # Coordinator: switch to the latest query.
//!
//! Turns a stream of queries into one stream of [`ResultState`]s. Only the feed
//! of the most recently seen query is visible; states of superseded feeds are
//! dropped.
//!
//! ## Switching
//! ```text
//! query ─► resolver.resolve(query) ─► feed
//!            └─► advance(): cancel old token, generation += 1, new child token
//!            └─► publish QuerySwitched
//!            └─► drain states the feed already holds (e.g. Loading)
//!            └─► spawn forward(generation, feed, token)
//!
//! forward:
//!   loop { select(token.cancelled, feed.next) ─► publish_if_current(generation, state) }
//! ```
//!
//! ## Rules
//! - A state is published only if its generation equals the current one; the
//!   check and the generation advance share one lock.
//! - Switching stops propagation only; the superseded cell runs to completion.
//! - When the query stream ends, the last feed keeps being forwarded until the
//!   attach token is cancelled or the feed ends.

use std::fmt::Display;
use std::sync::Arc;

use futures::{FutureExt, Stream, StreamExt};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::core::feed::Feed;
use crate::core::registry::Resolve;
use crate::core::replay::Replay;
use crate::events::{Bus, Event, EventKind};
use crate::state::{Payload, ResultState};

struct Current {
    generation: u64,
    token: CancellationToken,
}

/// Switch-to-latest driver behind one `ResultStream`.
pub(crate) struct Coordinator<Q, R, E> {
    output: Replay<ResultState<Q, R, E>>,
    current: Mutex<Current>,
    bus: Bus,
}

impl<Q: Payload, R: Payload, E: Payload + Display> Coordinator<Q, R, E> {
    pub fn new(bus: Bus) -> Arc<Self> {
        Arc::new(Self {
            output: Replay::new(),
            current: Mutex::new(Current {
                generation: 0,
                token: CancellationToken::new(),
            }),
            bus,
        })
    }

    /// Output point exposed to consumers.
    pub fn output(&self) -> Replay<ResultState<Q, R, E>> {
        self.output.clone()
    }

    /// Consumes `queries` until the stream ends or `token` is cancelled.
    pub async fn run<S>(
        self: Arc<Self>,
        queries: S,
        resolver: Arc<dyn Resolve<Q, R, E>>,
        token: CancellationToken,
    ) where
        S: Stream<Item = Q> + Send + 'static,
    {
        let mut queries = std::pin::pin!(queries);
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                next = queries.next() => match next {
                    Some(query) => self.switch_to(query, resolver.as_ref(), &token).await,
                    None => break,
                },
            }
        }
    }

    async fn switch_to(
        self: &Arc<Self>,
        query: Q,
        resolver: &dyn Resolve<Q, R, E>,
        parent: &CancellationToken,
    ) {
        let mut feed = resolver.resolve(query).await;
        let (generation, token) = self.advance(parent);
        self.bus.publish(
            Event::new(EventKind::QuerySwitched)
                .with_generation(generation)
                .with_key_opt(feed.key()),
        );

        while let Some(Some(state)) = feed.next().now_or_never() {
            self.publish_if_current(generation, state);
        }
        tokio::spawn(Arc::clone(self).forward(generation, feed, token));
    }

    /// Cancels the current generation and starts the next one.
    fn advance(&self, parent: &CancellationToken) -> (u64, CancellationToken) {
        let mut cur = self.current.lock();
        cur.token.cancel();
        cur.generation += 1;
        cur.token = parent.child_token();
        (cur.generation, cur.token.clone())
    }

    /// Publishes `state` if `generation` is still current.
    fn publish_if_current(&self, generation: u64, state: ResultState<Q, R, E>) -> bool {
        let cur = self.current.lock();
        if cur.generation == generation {
            self.output.publish(state);
            return true;
        }
        drop(cur);

        self.bus.publish(
            Event::new(EventKind::StaleResultDropped)
                .with_generation(generation)
                .with_reason(state.as_label()),
        );
        false
    }

    async fn forward(
        self: Arc<Self>,
        generation: u64,
        mut feed: Feed<Q, R, E>,
        token: CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                next = feed.next() => match next {
                    Some(state) => {
                        if !self.publish_if_current(generation, state) {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }
    }
}
