//! # QueryCaller: attach query streams, get result streams.
//!
//! The [`QueryCaller`] owns the event bus, a [`SubscriberSet`], the resolver
//! (cache registry or uncached) and the runtime token every driver it spawns
//! descends from.
//!
//! ## High-level architecture
//! ```text
//! attach(queries, invalidations):
//!   token = runtime_token.child_token()
//!   spawn Coordinator::run(queries, resolver, token)     ─► output Replay
//!   spawn invalidation_listener(invalidations, token)    ─► resolver.invalidate
//!   return ResultStream { output, DropGuard(token) }
//!
//! Event flow:
//!   cells / registry / coordinator ── publish(Event) ──► Bus
//!        ──► subscriber_listener ──► SubscriberSet::emit(&Event)
//!        ──► QueryCaller::events() receivers
//!
//! close():
//!   runtime_token.cancel() ─► every attach token ─► coordinators, forwarders,
//!                             invalidation listeners, subscriber listener
//! ```
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use futures::StreamExt;
//! use queryvisor::{CalleeFn, CalleeRef, ErrorBudget, QueryCaller, ResultState};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let search: CalleeRef<String, Vec<String>, String> = CalleeFn::arc("search", |q: String| async move {
//!         tokio::time::sleep(Duration::from_millis(20)).await;
//!         Ok::<_, String>(vec![format!("{q} result")])
//!     });
//!
//!     let caller = QueryCaller::builder(search)
//!         .timeout(Duration::from_secs(1))
//!         .retry(ErrorBudget::default())
//!         .cache_key(|q: &String| q.to_lowercase())
//!         .build()?;
//!
//!     let results = caller.watch(futures::stream::iter(["rust".to_string()]))?;
//!     let mut states = results.subscribe();
//!     while let Some(state) = states.next().await {
//!         if let ResultState::Success { response, .. } = state {
//!             assert_eq!(response, vec!["rust result".to_string()]);
//!             break;
//!         }
//!     }
//!     caller.close();
//!     Ok(())
//! }
//! ```

use std::fmt::Display;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::{CancellationToken, DropGuard};

use super::builder::QueryCallerBuilder;
use super::config::CallerConfig;
use super::coordinator::Coordinator;
use super::registry::Resolve;
use super::replay::{Replay, Subscription};
use crate::{
    callee::CalleeRef,
    error::CallerError,
    events::{Bus, Event},
    state::{Payload, ResultState},
    subscribers::SubscriberSet,
};

/// Turns query streams into result-state streams over one callee.
///
/// Cheap to clone; clones share the resolver (and thus the cache), the bus and
/// the runtime token.
pub struct QueryCaller<Q, R, E> {
    cfg: CallerConfig,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    resolver: Arc<dyn Resolve<Q, R, E>>,
    runtime_token: CancellationToken,
}

impl<Q, R, E> Clone for QueryCaller<Q, R, E> {
    fn clone(&self) -> Self {
        Self {
            cfg: self.cfg.clone(),
            bus: self.bus.clone(),
            subs: Arc::clone(&self.subs),
            resolver: Arc::clone(&self.resolver),
            runtime_token: self.runtime_token.clone(),
        }
    }
}

impl<Q: Payload, R: Payload, E: Payload + Display> QueryCaller<Q, R, E> {
    /// Starts building a caller around `callee`.
    pub fn builder(callee: CalleeRef<Q, R, E>) -> QueryCallerBuilder<Q, R, E> {
        QueryCallerBuilder::new(callee)
    }

    pub(crate) fn new_internal(
        cfg: CallerConfig,
        bus: Bus,
        subs: Arc<SubscriberSet>,
        resolver: Arc<dyn Resolve<Q, R, E>>,
        runtime_token: CancellationToken,
    ) -> Self {
        let caller = Self {
            cfg,
            bus,
            subs,
            resolver,
            runtime_token,
        };
        caller.subscriber_listener();
        caller
    }

    /// Attaches a query stream and an invalidation stream.
    ///
    /// Every query switches the returned stream to that query's states; every
    /// invalidation forces a fresh attempt chain for the query's key (cached
    /// callers only). Dropping every clone of the returned [`ResultStream`]
    /// stops both drivers; running callee calls are never interrupted.
    ///
    /// # Errors
    /// - [`CallerError::Closed`] after [`close`](Self::close)
    /// - [`CallerError::NoRuntime`] outside a tokio runtime
    pub fn attach<S, I>(
        &self,
        queries: S,
        invalidations: I,
    ) -> Result<ResultStream<Q, R, E>, CallerError>
    where
        S: Stream<Item = Q> + Send + 'static,
        I: Stream<Item = Q> + Send + 'static,
    {
        if self.runtime_token.is_cancelled() {
            return Err(CallerError::Closed);
        }
        let handle = tokio::runtime::Handle::try_current().map_err(|_| CallerError::NoRuntime)?;

        let token = self.runtime_token.child_token();
        let coordinator = Coordinator::new(self.bus.clone());
        let output = coordinator.output();

        handle.spawn(coordinator.run(queries, Arc::clone(&self.resolver), token.clone()));
        handle.spawn(invalidation_listener(
            invalidations,
            Arc::clone(&self.resolver),
            token.clone(),
        ));

        Ok(ResultStream {
            output,
            _guard: Arc::new(token.drop_guard()),
        })
    }

    /// Attaches a query stream without an invalidation stream.
    ///
    /// # Errors
    /// Same as [`attach`](Self::attach).
    pub fn watch<S>(&self, queries: S) -> Result<ResultStream<Q, R, E>, CallerError>
    where
        S: Stream<Item = Q> + Send + 'static,
    {
        self.attach(queries, futures::stream::pending())
    }

    /// Forces a fresh attempt chain for `query`'s key.
    ///
    /// Returns `false` when the key has never been requested (or the caller is
    /// uncached); nothing happens in that case.
    pub async fn invalidate(&self, query: Q) -> bool {
        self.resolver.invalidate(query).await
    }

    /// Sorted cache keys known to this caller (empty when uncached).
    pub async fn cached_keys(&self) -> Vec<String> {
        self.resolver.keys().await
    }

    /// Raw receiver of runtime events published after this call.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    #[inline]
    pub fn config(&self) -> &CallerConfig {
        &self.cfg
    }

    /// Stops every driver spawned by this caller and refuses new attachments.
    ///
    /// Attached result streams keep their latest state but receive no updates.
    /// Subscribers get the events published so far, then their workers exit.
    pub fn close(&self) {
        self.runtime_token.cancel();
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.runtime_token.is_cancelled()
    }

    /// Subscribes to the bus and forwards events to the subscriber set (fire-and-forget).
    ///
    /// On close, flushes what the bus already holds and drains the workers.
    fn subscriber_listener(&self) {
        if self.subs.is_empty() {
            return;
        }
        let mut rx = self.bus.subscribe();
        let set = Arc::clone(&self.subs);
        let token = self.runtime_token.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    msg = rx.recv() => match msg {
                        Ok(ev) => set.emit(&ev),
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "subscriber listener lagged behind the bus");
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            while let Ok(ev) = rx.try_recv() {
                set.emit(&ev);
            }
            set.shutdown().await;
        });
    }
}

/// Forwards invalidation requests to the resolver until cancelled.
async fn invalidation_listener<Q, R, E, I>(
    invalidations: I,
    resolver: Arc<dyn Resolve<Q, R, E>>,
    token: CancellationToken,
) where
    Q: Payload,
    R: Payload,
    E: Payload,
    I: Stream<Item = Q> + Send + 'static,
{
    let mut invalidations = std::pin::pin!(invalidations);
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            next = invalidations.next() => match next {
                Some(query) => {
                    resolver.invalidate(query).await;
                }
                None => break,
            },
        }
    }
}

/// Multicast, late-subscriber-safe stream of result states.
///
/// Every [`subscribe`](Self::subscribe) starts with the most recent state and
/// then follows the switched-to query. Clones share the same drivers; dropping
/// the last clone stops them, after which subscriptions end once drained.
pub struct ResultStream<Q, R, E> {
    output: Replay<ResultState<Q, R, E>>,
    _guard: Arc<DropGuard>,
}

impl<Q, R, E> Clone for ResultStream<Q, R, E> {
    fn clone(&self) -> Self {
        Self {
            output: self.output.clone(),
            _guard: Arc::clone(&self._guard),
        }
    }
}

impl<Q: Payload, R: Payload, E: Payload> ResultStream<Q, R, E> {
    /// New observer: the latest state (if any) first, then every later state.
    pub fn subscribe(&self) -> Subscription<ResultState<Q, R, E>> {
        self.output.subscribe()
    }

    /// The most recent state, if any query has been seen.
    pub fn latest(&self) -> Option<ResultState<Q, R, E>> {
        self.output.latest()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callee::CalleeFn;

    fn echo() -> CalleeRef<u32, u32, String> {
        CalleeFn::arc("echo", |q: u32| async move { Ok::<_, String>(q) })
    }

    #[test]
    fn build_requires_a_runtime() {
        let res = QueryCaller::builder(echo()).build();
        assert!(matches!(res, Err(CallerError::NoRuntime)));
    }

    #[tokio::test]
    async fn closed_caller_refuses_attach() {
        let caller = QueryCaller::builder(echo()).build().expect("caller");
        caller.close();
        assert!(caller.is_closed());
        let res = caller.watch(futures::stream::iter([1u32]));
        assert!(matches!(res, Err(CallerError::Closed)));
    }

    #[tokio::test]
    async fn uncached_caller_has_no_keys() {
        let caller = QueryCaller::builder(echo()).build().expect("caller");
        assert!(!caller.invalidate(1).await);
        assert!(caller.cached_keys().await.is_empty());
    }
}
