//! Refresh hook example
//!
//! Talks to an endpoint that always rejects the token, so every attempt fails
//! and the refresh hook runs once the retry budget is spent. Attempt events
//! are collected in memory and printed at the end.
//!
//! Usage:
//!   RUST_LOG=info cargo run --example refresh_hook

use apic::resilience::refresh_fn;
use apic::telemetry::InMemoryEventSink;
use apic::{ApiClient, ConfigOverlay};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let renewals = Arc::new(AtomicU32::new(0));
    let counter = renewals.clone();
    let events = Arc::new(InMemoryEventSink::default());

    let client = ApiClient::builder()
        .config(
            ConfigOverlay::new()
                .retries(2)
                .retry_delay(Duration::from_millis(200))
                .timeout(Duration::from_secs(5)),
        )
        .refresh_hook(refresh_fn(move || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                tracing::info!(renewal = n, "renewing credentials");
                Ok(())
            }
        }))
        .event_sink(events.clone())
        .build()?;

    let url = std::env::var("API_URL")
        .unwrap_or_else(|_| "https://httpbin.org/status/401".to_string());

    match client.get(&url, Some("expired-token")).await {
        Ok(value) => println!("unexpected success: {value}"),
        Err(e) => println!("gave up: {e} (last status {:?})", e.status()),
    }

    println!("renewals: {}", renewals.load(Ordering::SeqCst));
    for event in events.events() {
        println!("{}", serde_json::to_string(&event)?);
    }
    Ok(())
}
