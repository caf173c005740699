//! # apic
//!
//! Request execution for JSON HTTP APIs: every call runs under a deadline,
//! GET responses are cached for a configurable time, and failed attempts are
//! retried with a fixed delay and a final refresh step (credential renewal)
//! once the budget is spent.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use apic::{ApiClient, ConfigOverlay};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> apic::Result<()> {
//!     let client = ApiClient::with_config(
//!         ConfigOverlay::new()
//!             .retries(2)
//!             .timeout(Duration::from_secs(10)),
//!     )?;
//!
//!     // Cached for five minutes by default.
//!     let user = client.get("https://api.example.com/users/1", Some("token")).await?;
//!
//!     let created = client
//!         .post("https://api.example.com/users", &serde_json::json!({"name": "Ada"}), None, None)
//!         .await?;
//!
//!     println!("{user} {created}");
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`ApiClient`] facade, verb executors, method dispatch |
//! | [`config`] | [`ApiConfig`] defaults and partial overlays |
//! | [`cache`] | Per-client response store with lazy TTL checks |
//! | [`resilience`] | Timeout guard, retry orchestrator, refresh hooks |
//! | [`transport`] | Send capability, header construction, `reqwest` transport |
//! | [`telemetry`] | Attempt events for observing intermediate failures |

pub mod cache;
pub mod client;
pub mod config;
pub mod resilience;
pub mod telemetry;
pub mod transport;

pub use cache::{CacheEntry, CacheStore};
pub use client::{ApiClient, ApiClientBuilder, Executor, RequestBuilder};
pub use config::{ApiConfig, ConfigOverlay};
pub use resilience::{RefreshHook, RetryOrchestrator, RetryPolicy, TimeoutGuard};
pub use telemetry::{AttemptEvent, EventSink};
pub use transport::{HttpTransport, Method, Transport};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
