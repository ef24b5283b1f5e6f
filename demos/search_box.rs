//! # Demo: Search Box
//!
//! Simulates a user typing into a search box backed by a flaky service:
//! - `"timeout"` resolves after 2s (the caller times out at 1.5s);
//! - `"err"` fails after 1s;
//! - anything else answers after 1s.
//!
//! Timeouts are retried twice after 1s, other failures once right away
//! ([`ErrorBudget::default`]). Results are cached per query text; the script
//! invalidates one entry at the end.
//!
//! Run with `RUST_LOG=queryvisor=debug cargo run --example search_box`.

use std::{sync::Arc, time::Duration};

use futures::{StreamExt, channel::mpsc};
use queryvisor::{
    CalleeFn, CalleeRef, CallerConfig, ErrorBudget, LogWriter, QueryCaller, ResultState, Subscribe,
};
use tracing_subscriber::EnvFilter;

fn search_service() -> CalleeRef<String, String, String> {
    CalleeFn::arc("search", |query: String| async move {
        println!("[service] request for {query:?}");
        match query.as_str() {
            "timeout" => {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Ok("resolve after timeout".to_string())
            }
            "err" => {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Err("err!".to_string())
            }
            _ => {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok(format!("response for {query}"))
            }
        }
    })
}

fn render(state: &ResultState<String, String, String>) -> String {
    match state {
        ResultState::Loading { query } => format!("{query:?}: loading"),
        ResultState::Success { query, response } => format!("{query:?}: success: {response}"),
        ResultState::Error { query, error } => format!("{query:?}: error: {error}"),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = CallerConfig {
        timeout: Duration::from_millis(1500),
        ..CallerConfig::default()
    };
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];

    let caller = QueryCaller::builder(search_service())
        .config(cfg)
        .retry(ErrorBudget::default())
        .cache_key(|q: &String| q.clone())
        .subscribers(subs)
        .build()?;

    let (query_tx, query_rx) = mpsc::unbounded();
    let (invalidate_tx, invalidate_rx) = mpsc::unbounded();
    let queries = query_rx.filter(|q: &String| futures::future::ready(!q.is_empty()));
    let results = caller.attach(queries, invalidate_rx)?;

    let mut states = results.subscribe();
    let printer = tokio::spawn(async move {
        while let Some(state) = states.next().await {
            println!("[ui] {}", render(&state));
        }
    });

    let script: [(&str, u64); 6] = [
        ("r", 100),
        ("rust", 1500),
        ("", 100),
        ("err", 2500),
        ("timeout", 9000),
        ("rust", 500),
    ];
    for (query, pause_ms) in script {
        println!("[user] types {query:?}");
        query_tx.unbounded_send(query.to_string())?;
        tokio::time::sleep(Duration::from_millis(pause_ms)).await;
    }

    println!("[user] invalidates \"rust\"");
    invalidate_tx.unbounded_send("rust".to_string())?;
    tokio::time::sleep(Duration::from_millis(1500)).await;

    println!("[cache] keys: {:?}", caller.cached_keys().await);
    caller.close();
    drop(results);
    let _ = printer.await;
    Ok(())
}
