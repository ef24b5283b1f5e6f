//! # Run a single call attempt.
//!
//! Executes one attempt of a [`Callee`] with optional timeout and publishes
//! lifecycle events to the [`Bus`].
//!
//! ## Event flow
//! ```text
//! Success:
//!   callee.call() → Ok(r)  → (caller publishes CallSucceeded)
//!
//! Failure:
//!   callee.call() → Err(e) → publish CallFailed
//!
//! Timeout:
//!   timeout exceeded → publish TimeoutHit
//!                    → detach the call (it keeps running)
//!                    → publish CallFailed (timeout)
//!                    → later: publish LateResultDiscarded when it settles
//! ```
//!
//! ## Rules
//! - The callee future is built and polled inside its own task, so the timeout
//!   never aborts it.
//! - A callee panic, whether while building the future or while polling it, is
//!   reported as [`CallError::Panicked`], not propagated.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinError, JoinHandle};
use tokio::time;

use crate::callee::CalleeRef;
use crate::core::cell::EventScope;
use crate::error::{CallError, panic_message};
use crate::events::{Bus, EventKind};
use crate::state::Payload;

/// Executes a single attempt of `callee` for `query`.
///
/// With `timeout = Some(dur)` and `dur > 0`, an attempt that has not settled in
/// time fails with [`CallError::Timeout`] while the call itself runs on.
pub(crate) async fn call_once<Q, R, E>(
    callee: &CalleeRef<Q, R, E>,
    query: Q,
    timeout: Option<Duration>,
    attempt: u32,
    scope: &EventScope,
    bus: &Bus,
) -> Result<R, CallError<E>>
where
    Q: Payload,
    R: Payload,
    E: Payload + Display,
{
    let callee = Arc::clone(callee);
    let mut handle = tokio::spawn(async move { callee.call(query).await });

    let joined = match timeout.filter(|d| *d > Duration::ZERO) {
        Some(dur) => match time::timeout(dur, &mut handle).await {
            Ok(joined) => joined,
            Err(_elapsed) => {
                bus.publish(
                    scope
                        .event(EventKind::TimeoutHit)
                        .with_attempt(attempt)
                        .with_timeout(dur),
                );
                discard_late(handle, scope.clone(), attempt, bus.clone());
                let err = CallError::Timeout { timeout: dur };
                publish_failed(bus, scope, attempt, &err);
                return Err(err);
            }
        },
        None => handle.await,
    };

    let res = match joined {
        Ok(Ok(response)) => Ok(response),
        Ok(Err(e)) => Err(CallError::Failed(e)),
        Err(join_err) => Err(CallError::Panicked {
            message: join_message(join_err),
        }),
    };
    if let Err(e) = &res {
        publish_failed(bus, scope, attempt, e);
    }
    res
}

/// Lets a timed-out call finish in the background and reports its dropped outcome.
fn discard_late<R, E>(
    handle: JoinHandle<Result<R, E>>,
    scope: EventScope,
    attempt: u32,
    bus: Bus,
) where
    R: Send + 'static,
    E: Send + 'static,
{
    tokio::spawn(async move {
        let _ = handle.await;
        bus.publish(
            scope
                .event(EventKind::LateResultDiscarded)
                .with_attempt(attempt),
        );
    });
}

/// Publishes `CallFailed` with error details.
fn publish_failed<E: Display>(bus: &Bus, scope: &EventScope, attempt: u32, err: &CallError<E>) {
    bus.publish(
        scope
            .event(EventKind::CallFailed)
            .with_attempt(attempt)
            .with_reason(err.to_string()),
    );
}

fn join_message(err: JoinError) -> String {
    match err.try_into_panic() {
        Ok(panic) => panic_message(panic.as_ref()),
        Err(err) => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callee::CalleeFn;

    fn scope() -> EventScope {
        EventScope {
            cell: 1,
            key: Some(Arc::from("k")),
            callee: Arc::from("test"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_detaches_the_call() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let slow: CalleeRef<u32, u32, String> = CalleeFn::arc("slow", |q: u32| async move {
            time::sleep(Duration::from_secs(2)).await;
            Ok::<_, String>(q * 2)
        });

        let res = call_once(&slow, 21, Some(Duration::from_secs(1)), 0, &scope(), &bus).await;
        assert_eq!(
            res,
            Err(CallError::Timeout {
                timeout: Duration::from_secs(1)
            })
        );

        let kinds: Vec<EventKind> = [rx.recv().await, rx.recv().await]
            .into_iter()
            .map(|ev| ev.expect("event").kind)
            .collect();
        assert_eq!(kinds, vec![EventKind::TimeoutHit, EventKind::CallFailed]);

        let late = rx.recv().await.expect("late event");
        assert_eq!(late.kind, EventKind::LateResultDiscarded);
        assert_eq!(late.key.as_deref(), Some("k"));
    }

    #[tokio::test]
    async fn panics_become_errors() {
        let bus = Bus::new(16);
        let boom: CalleeRef<u32, u32, String> = CalleeFn::arc("boom", |_q: u32| async move {
            if true {
                panic!("callee exploded");
            }
            Ok::<u32, String>(0)
        });

        let res = call_once(&boom, 1, None, 0, &scope(), &bus).await;
        assert_eq!(
            res,
            Err(CallError::Panicked {
                message: "callee exploded".to_string()
            })
        );
    }

    #[tokio::test]
    async fn panic_before_the_future_exists_becomes_an_error() {
        let bus = Bus::new(16);
        let eager: CalleeRef<u32, u32, String> = CalleeFn::arc("eager", |q: u32| {
            if q == 0 {
                panic!("refusing query 0");
            }
            async move { Ok::<_, String>(q) }
        });

        let res = call_once(&eager, 0, None, 0, &scope(), &bus).await;
        assert_eq!(
            res,
            Err(CallError::Panicked {
                message: "refusing query 0".to_string()
            })
        );
    }

    #[tokio::test]
    async fn zero_timeout_means_no_timeout() {
        let bus = Bus::new(16);
        let quick: CalleeRef<u32, u32, String> =
            CalleeFn::arc("quick", |q: u32| async move { Ok::<_, String>(q + 1) });
        let res = call_once(&quick, 1, Some(Duration::ZERO), 0, &scope(), &bus).await;
        assert_eq!(res, Ok(2));
    }
}
