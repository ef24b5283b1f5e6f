use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::channel::mpsc;
use parking_lot::Mutex;
use queryvisor::{
    CallError, CalleeFn, CalleeRef, Event, EventKind, QueryCaller, ResultState, Subscribe,
};
use tokio::time::{self, Instant};

type State = ResultState<String, String, String>;

/// Callee that sleeps `delay`, counts its invocations and fails when asked to.
fn counting(
    calls: Arc<AtomicUsize>,
    delay: Duration,
    fail: bool,
) -> CalleeRef<String, String, String> {
    CalleeFn::arc("search", move |q: String| {
        let calls = Arc::clone(&calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            time::sleep(delay).await;
            if fail {
                Err(format!("{q} unavailable"))
            } else {
                Ok(format!("results for {q}"))
            }
        }
    })
}

fn loading(q: &str) -> State {
    ResultState::Loading {
        query: q.to_string(),
    }
}

fn success(q: &str) -> State {
    ResultState::Success {
        query: q.to_string(),
        response: format!("results for {q}"),
    }
}

#[tokio::test(start_paused = true)]
async fn fresh_query_yields_loading_then_one_terminal_state() {
    let calls = Arc::new(AtomicUsize::new(0));
    let caller = QueryCaller::builder(counting(calls.clone(), Duration::from_millis(100), false))
        .build()
        .expect("caller");

    let results = caller
        .watch(futures::stream::iter(["rust".to_string()]))
        .expect("attach");
    let mut states = results.subscribe();

    assert_eq!(states.next().await, Some(loading("rust")));
    assert_eq!(states.next().await, Some(success("rust")));

    time::sleep(Duration::from_secs(5)).await;
    assert_eq!(states.try_recv(), None);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn newer_query_hides_the_previous_one() {
    let calls = Arc::new(AtomicUsize::new(0));
    let caller = QueryCaller::builder(counting(calls.clone(), Duration::from_millis(100), false))
        .build()
        .expect("caller");

    let (tx, rx) = mpsc::unbounded();
    let results = caller.watch(rx).expect("attach");
    let mut states = results.subscribe();

    tx.unbounded_send("first".to_string()).expect("send");
    assert_eq!(states.next().await, Some(loading("first")));

    tx.unbounded_send("second".to_string()).expect("send");
    assert_eq!(states.next().await, Some(loading("second")));
    assert_eq!(states.next().await, Some(success("second")));

    time::sleep(Duration::from_secs(1)).await;
    assert_eq!(states.try_recv(), None, "first query never surfaces again");
    assert_eq!(calls.load(Ordering::SeqCst), 2, "superseded call still ran");
}

#[tokio::test(start_paused = true)]
async fn same_key_before_settlement_calls_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let caller = QueryCaller::builder(counting(calls.clone(), Duration::from_millis(100), false))
        .cache_key(|q: &String| q.to_lowercase())
        .build()
        .expect("caller");

    let (tx, rx) = mpsc::unbounded();
    let results = caller.watch(rx).expect("attach");
    let mut states = results.subscribe();

    tx.unbounded_send("Rust".to_string()).expect("send");
    assert_eq!(states.next().await, Some(loading("Rust")));
    tx.unbounded_send("rust".to_string()).expect("send");

    let terminal = loop {
        let state = states.next().await.expect("state");
        if state.is_terminal() {
            break state;
        }
        assert_eq!(state, loading("Rust"), "followers see the shared cell");
    };
    assert_eq!(terminal, success("Rust"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(caller.cached_keys().await, vec!["rust".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn retries_are_silent_until_the_policy_gives_up() {
    let calls = Arc::new(AtomicUsize::new(0));
    let caller = QueryCaller::builder(counting(calls.clone(), Duration::from_millis(10), true))
        .retry_fn(|_err, ctx| {
            if ctx.attempt < 2 {
                Some(queryvisor::RetryDecision::Retry {
                    delay: Duration::ZERO,
                })
            } else {
                Some(queryvisor::RetryDecision::GiveUp {
                    reason: CallError::Failed("budget spent".to_string()),
                })
            }
        })
        .build()
        .expect("caller");

    let results = caller
        .watch(futures::stream::iter(["flaky".to_string()]))
        .expect("attach");
    let mut states = results.subscribe();

    assert_eq!(states.next().await, Some(loading("flaky")));
    assert_eq!(
        states.next().await,
        Some(ResultState::Error {
            query: "flaky".to_string(),
            error: CallError::Failed("budget spent".to_string()),
        })
    );
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn timeout_fails_the_attempt_and_discards_the_late_result() {
    let calls = Arc::new(AtomicUsize::new(0));
    let caller = QueryCaller::builder(counting(calls.clone(), Duration::from_millis(2000), false))
        .timeout(Duration::from_millis(1000))
        .build()
        .expect("caller");
    let mut events = caller.events();

    let start = Instant::now();
    let results = caller
        .watch(futures::stream::iter(["slow".to_string()]))
        .expect("attach");
    let mut states = results.subscribe();

    assert_eq!(states.next().await, Some(loading("slow")));
    let terminal = states.next().await.expect("terminal");
    let elapsed = start.elapsed();
    assert_eq!(
        terminal.error(),
        Some(&CallError::Timeout {
            timeout: Duration::from_millis(1000)
        })
    );
    assert!(elapsed >= Duration::from_millis(1000) && elapsed < Duration::from_millis(1100));

    time::sleep(Duration::from_secs(2)).await;
    assert_eq!(states.try_recv(), None, "late resolution is not surfaced");

    let mut kinds = Vec::new();
    while let Ok(ev) = events.try_recv() {
        kinds.push(ev.kind);
    }
    assert!(kinds.contains(&EventKind::TimeoutHit));
    assert!(kinds.contains(&EventKind::LateResultDiscarded));
}

#[tokio::test(start_paused = true)]
async fn invalidation_reruns_a_known_key_only() {
    let calls = Arc::new(AtomicUsize::new(0));
    let caller = QueryCaller::builder(counting(calls.clone(), Duration::from_millis(100), false))
        .cache_key(|q: &String| q.clone())
        .build()
        .expect("caller");

    let (inv_tx, inv_rx) = mpsc::unbounded();
    let results = caller
        .attach(futures::stream::iter(["docs".to_string()]), inv_rx)
        .expect("attach");
    let mut states = results.subscribe();

    assert_eq!(states.next().await, Some(loading("docs")));
    assert_eq!(states.next().await, Some(success("docs")));

    inv_tx.unbounded_send("docs".to_string()).expect("send");
    assert_eq!(states.next().await, Some(loading("docs")));
    assert_eq!(states.next().await, Some(success("docs")));
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    inv_tx.unbounded_send("unseen".to_string()).expect("send");
    assert!(!caller.invalidate("also-unseen".to_string()).await);
    time::sleep(Duration::from_secs(1)).await;
    assert_eq!(states.try_recv(), None);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(caller.cached_keys().await, vec!["docs".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn late_subscribers_share_the_settled_state() {
    let calls = Arc::new(AtomicUsize::new(0));
    let caller = QueryCaller::builder(counting(calls.clone(), Duration::from_millis(100), false))
        .cache_key(|q: &String| q.clone())
        .build()
        .expect("caller");

    let results = caller
        .watch(futures::stream::iter(["tokio".to_string()]))
        .expect("attach");
    let mut first = results.subscribe();
    first.next().await;
    assert_eq!(first.next().await, Some(success("tokio")));

    let mut a = results.subscribe();
    let mut b = results.clone().subscribe();
    assert_eq!(a.next().await, Some(success("tokio")));
    assert_eq!(b.next().await, Some(success("tokio")));
    assert_eq!(results.latest(), Some(success("tokio")));

    let again = caller
        .watch(futures::stream::iter(["tokio".to_string()]))
        .expect("attach");
    let mut c = again.subscribe();
    assert_eq!(c.next().await, Some(success("tokio")));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_result_stream_ends_subscriptions() {
    let calls = Arc::new(AtomicUsize::new(0));
    let caller = QueryCaller::builder(counting(calls.clone(), Duration::from_millis(100), false))
        .build()
        .expect("caller");

    let (tx, rx) = mpsc::unbounded::<String>();
    let results = caller.watch(rx).expect("attach");
    let mut states = results.subscribe();
    tx.unbounded_send("gone".to_string()).expect("send");
    assert_eq!(states.next().await, Some(loading("gone")));

    drop(results);
    assert_eq!(states.next().await, None);
    caller.close();
    assert!(caller.watch(futures::stream::empty()).is_err());
}

struct Recorder {
    seen: Mutex<Vec<EventKind>>,
}

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, event: &Event) {
        self.seen.lock().push(event.kind);
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

#[tokio::test(start_paused = true)]
async fn subscribers_observe_cache_events() {
    let recorder = Arc::new(Recorder {
        seen: Mutex::new(Vec::new()),
    });
    let calls = Arc::new(AtomicUsize::new(0));
    let caller = QueryCaller::builder(counting(calls, Duration::from_millis(10), false))
        .cache_key(|q: &String| q.clone())
        .subscribers(vec![recorder.clone() as Arc<dyn Subscribe>])
        .build()
        .expect("caller");

    let results = caller
        .watch(futures::stream::iter(["a".to_string(), "a".to_string()]))
        .expect("attach");
    let mut states = results.subscribe();
    while let Some(state) = states.next().await {
        if state.is_terminal() {
            break;
        }
    }
    time::sleep(Duration::from_millis(50)).await;

    let seen = recorder.seen.lock().clone();
    assert_eq!(
        seen.iter().filter(|k| **k == EventKind::CellCreated).count(),
        1
    );
    assert!(seen.contains(&EventKind::CacheHit));
    assert!(seen.contains(&EventKind::CallSucceeded));
    caller.close();
}

#[tokio::test(start_paused = true)]
async fn close_drains_subscriber_workers() {
    let recorder = Arc::new(Recorder {
        seen: Mutex::new(Vec::new()),
    });
    let calls = Arc::new(AtomicUsize::new(0));
    let caller = QueryCaller::builder(counting(calls, Duration::from_millis(10), false))
        .subscribers(vec![recorder.clone() as Arc<dyn Subscribe>])
        .build()
        .expect("caller");

    let results = caller
        .watch(futures::stream::iter(["x".to_string()]))
        .expect("attach");
    let mut states = results.subscribe();
    states.next().await;
    states.next().await;
    assert_eq!(Arc::strong_count(&recorder), 2, "worker holds the subscriber");

    caller.close();
    time::sleep(Duration::from_millis(10)).await;

    assert_eq!(Arc::strong_count(&recorder), 1, "worker exited after close");
    assert!(recorder.seen.lock().contains(&EventKind::CallSucceeded));
}

#[tokio::test(start_paused = true)]
async fn callee_panicking_before_its_future_exists_settles_as_error() {
    let callee: CalleeRef<String, String, String> = CalleeFn::arc("strict", |q: String| {
        if q.is_empty() {
            panic!("empty query");
        }
        async move { Ok::<_, String>(q) }
    });
    let caller = QueryCaller::builder(callee).build().expect("caller");

    let results = caller
        .watch(futures::stream::iter([String::new()]))
        .expect("attach");
    let mut states = results.subscribe();

    assert_eq!(states.next().await, Some(loading("")));
    assert_eq!(
        states.next().await,
        Some(ResultState::Error {
            query: String::new(),
            error: CallError::Panicked {
                message: "empty query".to_string()
            },
        })
    );
}
