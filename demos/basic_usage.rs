//! Basic usage example
//!
//! Fetches a resource twice (the second read is served from the cache),
//! creates one, and dispatches a request whose method is chosen at runtime.
//!
//! The target defaults to https://jsonplaceholder.typicode.com and can be
//! overridden with API_BASE_URL. Log verbosity follows RUST_LOG.
//!
//! Usage:
//!   RUST_LOG=apic=debug cargo run --example basic_usage

use apic::{ApiClient, ConfigOverlay};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize)]
struct Post {
    id: u64,
    title: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let base = std::env::var("API_BASE_URL")
        .unwrap_or_else(|_| "https://jsonplaceholder.typicode.com".to_string());

    let client = ApiClient::with_config(
        ConfigOverlay::new()
            .retries(2)
            .retry_delay(Duration::from_millis(250))
            .timeout(Duration::from_secs(10)),
    )?;

    let url = format!("{base}/posts/1");
    let post: Post = client.get_as(&url, None).await?;
    println!("#{} {}", post.id, post.title);

    // Served from the cache.
    let again = client.get(&url, None).await?;
    println!("cached: {}", again["title"]);
    println!("cache stats: {:?}", client.cache().stats());

    let created = client
        .post(
            &format!("{base}/posts"),
            &json!({"title": "hello", "body": "from apic", "userId": 1}),
            None,
            None,
        )
        .await?;
    println!("created: {created}");

    let method = std::env::args().nth(1).unwrap_or_else(|| "delete".to_string());
    match client.request(method.as_str(), url.as_str()).send().await {
        Ok(value) => println!("{method}: {value}"),
        Err(e) => eprintln!("{method} failed: {e}"),
    }

    Ok(())
}
