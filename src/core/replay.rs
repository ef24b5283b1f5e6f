//! # Replay: multicast broadcast point with memory of the latest value.
//!
//! [`Replay`] holds the most recent value and a list of observers. Every new
//! [`Subscription`] first receives the latest value (if any), then every value
//! published afterwards, in order.
//!
//! ```text
//! publish(a) ──► latest = a ──► [obs 1] [obs 2]
//! subscribe()                    └─ gets `a` immediately, then later values
//! publish(b) ──► latest = b ──► [obs 1] [obs 2] [obs 3]
//! ```
//!
//! ## Rules
//! - Lossless per observer (unbounded queue); there is no backpressure.
//! - Observers whose subscription was dropped are pruned on the next publish or
//!   subscribe, so a settled value followed by many short-lived observers does
//!   not accumulate senders.
//! - Publishing and subscribing are serialized by one lock, so a subscriber can
//!   never miss a value published concurrently with its subscription.
//! - Dropping the last `Replay` handle ends all subscriptions after they drain.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use parking_lot::Mutex;
use tokio::sync::mpsc;

struct ReplayState<T> {
    latest: Option<T>,
    observers: Vec<mpsc::UnboundedSender<T>>,
}

/// Latest-value-memoizing multicast point.
pub struct Replay<T> {
    inner: Arc<Mutex<ReplayState<T>>>,
}

impl<T> Clone for Replay<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone> Replay<T> {
    /// Creates an empty replay point; subscribers wait for the first publish.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ReplayState {
                latest: None,
                observers: Vec::new(),
            })),
        }
    }

    /// Creates a replay point already holding `value`.
    pub fn with_latest(value: T) -> Self {
        let replay = Self::new();
        replay.inner.lock().latest = Some(value);
        replay
    }

    /// Stores `value` as latest and delivers it to every live observer.
    pub fn publish(&self, value: T) {
        let mut state = self.inner.lock();
        state.observers.retain(|tx| tx.send(value.clone()).is_ok());
        state.latest = Some(value);
    }

    /// Attaches a new observer; it receives the latest value first.
    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.inner.lock();
        state.observers.retain(|tx| !tx.is_closed());
        if let Some(latest) = &state.latest {
            let _ = tx.send(latest.clone());
        }
        state.observers.push(tx);
        Subscription { rx }
    }

    /// Returns a copy of the latest value.
    pub fn latest(&self) -> Option<T> {
        self.inner.lock().latest.clone()
    }

    /// Number of attached observers, including ones dropped since the last
    /// publish or subscribe.
    pub fn observer_count(&self) -> usize {
        self.inner.lock().observers.len()
    }
}

impl<T: Clone> Default for Replay<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// One observer of a [`Replay`]; a [`Stream`] of its values.
pub struct Subscription<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> Subscription<T> {
    /// Waits for the next value; `None` once the replay point is gone and drained.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Returns the next value if one is already queued.
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    pub(crate) fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.rx.poll_recv(cx)
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn late_subscriber_gets_latest_then_updates() {
        let replay = Replay::new();
        let mut early = replay.subscribe();
        assert_eq!(early.try_recv(), None);

        replay.publish(1);
        replay.publish(2);

        let mut late = replay.subscribe();
        assert_eq!(late.try_recv(), Some(2));
        assert_eq!(late.try_recv(), None);

        replay.publish(3);
        assert_eq!(early.try_recv(), Some(1));
        assert_eq!(early.try_recv(), Some(2));
        assert_eq!(early.try_recv(), Some(3));
        assert_eq!(late.try_recv(), Some(3));
    }

    #[test]
    fn dropped_observers_are_pruned() {
        let replay = Replay::with_latest("a");
        let sub = replay.subscribe();
        let _kept = replay.subscribe();
        drop(sub);
        assert_eq!(replay.observer_count(), 2);

        replay.publish("b");
        assert_eq!(replay.observer_count(), 1);
        assert_eq!(replay.latest(), Some("b"));
    }

    #[test]
    fn settled_value_does_not_accumulate_observers() {
        let replay = Replay::with_latest(1);
        let _kept = replay.subscribe();
        for _ in 0..10_000 {
            let mut sub = replay.subscribe();
            assert_eq!(sub.try_recv(), Some(1));
        }
        assert!(replay.observer_count() <= 2, "{}", replay.observer_count());
    }

    #[tokio::test]
    async fn subscription_ends_when_replay_is_gone() {
        let replay = Replay::with_latest(7);
        let mut sub = replay.subscribe();
        drop(replay);
        assert_eq!(sub.recv().await, Some(7));
        assert_eq!(sub.recv().await, None);
    }
}
