use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::caller::QueryCaller;
use super::cell::CallPlan;
use super::config::CallerConfig;
use super::registry::{CacheRegistry, KeyFn, Resolve, Uncached};
use crate::{
    callee::CalleeRef,
    error::{CallError, CallerError},
    events::Bus,
    policies::{NoRetry, RetryContext, RetryDecision, RetryFn, RetryPolicy, RetryRef},
    state::Payload,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`QueryCaller`] with optional features.
///
/// Defaults: no timeout, [`NoRetry`], no caching, no subscribers.
pub struct QueryCallerBuilder<Q, R, E> {
    callee: CalleeRef<Q, R, E>,
    cfg: CallerConfig,
    retry: Option<RetryRef<E>>,
    cache_key: Option<KeyFn<Q>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl<Q: Payload, R: Payload, E: Payload + std::fmt::Display> QueryCallerBuilder<Q, R, E> {
    /// Creates a new builder around the given callee.
    pub fn new(callee: CalleeRef<Q, R, E>) -> Self {
        Self {
            callee,
            cfg: CallerConfig::default(),
            retry: None,
            cache_key: None,
            subscribers: Vec::new(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, cfg: CallerConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Sets the per-attempt timeout (`Duration::ZERO` disables it).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.cfg.timeout = timeout;
        self
    }

    /// Sets the retry policy consulted after every failed attempt.
    pub fn retry<P: RetryPolicy<E>>(mut self, policy: P) -> Self {
        self.retry = Some(Arc::new(policy));
        self
    }

    /// Sets an already shared retry policy.
    pub fn retry_ref(mut self, policy: RetryRef<E>) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Sets a closure-backed retry policy (see [`RetryFn`]).
    pub fn retry_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&CallError<E>, &RetryContext) -> Option<RetryDecision<E>> + Send + Sync + 'static,
    {
        self.retry = Some(RetryFn::arc(f));
        self
    }

    /// Enables per-key result sharing.
    ///
    /// `key` must be pure: queries meant to share results must map to equal keys.
    /// Without a key function every query gets its own attempt chain.
    pub fn cache_key<F>(mut self, key: F) -> Self
    where
        F: Fn(&Q) -> String + Send + Sync + 'static,
    {
        self.cache_key = Some(Arc::new(key));
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (cell lifecycle, cache hits, switches)
    /// through dedicated workers with bounded queues.
    pub fn subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the caller.
    ///
    /// Initializes the event bus, the subscriber workers and the resolver
    /// (cache registry when a key function is set, uncached otherwise).
    ///
    /// # Errors
    /// [`CallerError::NoRuntime`] when called outside a tokio runtime.
    pub fn build(self) -> Result<QueryCaller<Q, R, E>, CallerError> {
        tokio::runtime::Handle::try_current().map_err(|_| CallerError::NoRuntime)?;

        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));

        let retry: RetryRef<E> = match self.retry {
            Some(retry) => retry,
            None => Arc::new(NoRetry),
        };
        let plan = Arc::new(CallPlan {
            callee: self.callee,
            retry,
            timeout: self.cfg.default_timeout(),
            bus: bus.clone(),
        });

        let resolver: Arc<dyn Resolve<Q, R, E>> = match self.cache_key {
            Some(key_fn) => Arc::new(CacheRegistry::new(key_fn, plan)),
            None => Arc::new(Uncached::new(plan)),
        };

        Ok(QueryCaller::new_internal(
            self.cfg,
            bus,
            subs,
            resolver,
            CancellationToken::new(),
        ))
    }
}
