//! # Resolvers: turn a query into a [`Feed`].
//!
//! - [`CacheRegistry`] keeps one single-slot `Replay<CellRef>` per cache key and
//!   shares the active cell between every query mapping to that key.
//! - [`Uncached`] builds a fresh cell for every query.
//!
//! ## Architecture
//! ```text
//! resolve(query)
//!   └─► key = key_fn(&query)
//!        ├─ read lock:  entry exists ─► CacheHit, follow slot
//!        └─ write lock: entry(key)
//!                ├─ Occupied ─► CacheHit, follow slot
//!                └─ Vacant   ─► plan.cell(query), insert slot, follow slot
//!
//! invalidate(query)
//!   └─► slot for key?
//!        ├─ none ─► InvalidationIgnored, false
//!        └─ some ─► plan.cell(query), CacheInvalidated, slot.publish(cell), true
//! ```
//!
//! ## Rules
//! - The entry map is the only shared mutable state; check-then-insert happens
//!   under one write lock, so concurrent first lookups share one cell.
//! - The first query of a key is retained; later queries follow its cell.
//! - Replacement is last-write-wins. Entries are never evicted.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::core::cell::{CallPlan, CellRef};
use crate::core::feed::Feed;
use crate::core::replay::Replay;
use crate::events::{Event, EventKind};
use crate::state::Payload;

/// Pure function deriving the cache key of a query.
pub(crate) type KeyFn<Q> = Arc<dyn Fn(&Q) -> String + Send + Sync + 'static>;

/// Maps queries to state feeds and handles invalidation.
#[async_trait]
pub(crate) trait Resolve<Q, R, E>: Send + Sync + 'static {
    /// Returns the feed serving `query`.
    async fn resolve(&self, query: Q) -> Feed<Q, R, E>;

    /// Replaces the active cell of `query`'s key; `false` when there is nothing to replace.
    async fn invalidate(&self, query: Q) -> bool;

    /// Sorted list of known keys.
    async fn keys(&self) -> Vec<String>;
}

/// Keyed registry of active cells.
pub(crate) struct CacheRegistry<Q, R, E> {
    entries: RwLock<HashMap<String, Replay<CellRef<Q, R, E>>>>,
    key_fn: KeyFn<Q>,
    plan: Arc<CallPlan<Q, R, E>>,
}

impl<Q: Payload, R: Payload, E: Payload + Display> CacheRegistry<Q, R, E> {
    pub fn new(key_fn: KeyFn<Q>, plan: Arc<CallPlan<Q, R, E>>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            key_fn,
            plan,
        }
    }

    fn hit(&self, key: &Arc<str>, slot: &Replay<CellRef<Q, R, E>>) -> Feed<Q, R, E> {
        let mut ev = Event::new(EventKind::CacheHit).with_key(Arc::clone(key));
        if let Some(cell) = slot.latest() {
            ev = ev
                .with_cell(cell.id())
                .with_attempt(cell.attempt())
                .with_reason(cell.latest().as_label());
        }
        self.plan.bus.publish(ev);
        Feed::follow(slot, Some(Arc::clone(key)))
    }
}

#[async_trait]
impl<Q: Payload, R: Payload, E: Payload + Display> Resolve<Q, R, E> for CacheRegistry<Q, R, E> {
    async fn resolve(&self, query: Q) -> Feed<Q, R, E> {
        let key = (self.key_fn)(&query);
        let shared: Arc<str> = Arc::from(key.as_str());

        {
            let entries = self.entries.read().await;
            if let Some(slot) = entries.get(&key) {
                return self.hit(&shared, slot);
            }
        }

        let mut entries = self.entries.write().await;
        match entries.entry(key) {
            Entry::Occupied(slot) => self.hit(&shared, slot.get()),
            Entry::Vacant(vacant) => {
                let cell = self.plan.cell(query, Some(Arc::clone(&shared)));
                let slot = vacant.insert(Replay::with_latest(cell));
                Feed::follow(slot, Some(shared))
            }
        }
    }

    async fn invalidate(&self, query: Q) -> bool {
        let key = (self.key_fn)(&query);
        let slot = self.entries.read().await.get(&key).cloned();

        let Some(slot) = slot else {
            self.plan
                .bus
                .publish(Event::new(EventKind::InvalidationIgnored).with_key(key));
            return false;
        };

        let cell = self.plan.cell(query, Some(Arc::from(key.as_str())));
        self.plan.bus.publish(
            Event::new(EventKind::CacheInvalidated)
                .with_key(key)
                .with_cell(cell.id()),
        );
        slot.publish(cell);
        true
    }

    async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().await.keys().cloned().collect();
        keys.sort_unstable();
        keys
    }
}

/// Resolver without caching: one fresh cell per query.
pub(crate) struct Uncached<Q, R, E> {
    plan: Arc<CallPlan<Q, R, E>>,
}

impl<Q, R, E> Uncached<Q, R, E> {
    pub fn new(plan: Arc<CallPlan<Q, R, E>>) -> Self {
        Self { plan }
    }
}

#[async_trait]
impl<Q: Payload, R: Payload, E: Payload + Display> Resolve<Q, R, E> for Uncached<Q, R, E> {
    async fn resolve(&self, query: Q) -> Feed<Q, R, E> {
        Feed::single(self.plan.cell(query, None))
    }

    async fn invalidate(&self, _query: Q) -> bool {
        false
    }

    async fn keys(&self) -> Vec<String> {
        Vec::new()
    }
}
