//! Failure policy for the request pipeline.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`timeout`] | Races a network call against a deadline |
//! | [`retry`] | Bounded-attempt orchestrator with a trailing refresh step |
//! | [`refresh`] | Injectable refresh hooks (credential/session renewal) |
//!
//! ```rust
//! use apic::resilience::{RetryOrchestrator, RetryPolicy};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let orchestrator = RetryOrchestrator::new(RetryPolicy::new(2, Duration::from_millis(1)));
//! let value = orchestrator.run(|| async { Ok::<_, apic::Error>(7) }).await.unwrap();
//! assert_eq!(value, 7);
//! # });
//! ```

pub mod refresh;
pub mod retry;
pub mod timeout;

pub use refresh::{log_refresh, refresh_fn, LogRefresh, RefreshHook};
pub use retry::{
    with_retry, RetryOrchestrator, RetryPolicy, RetryState, DEFAULT_REFRESH_LIMIT, MAX_RETRIES,
};
pub use timeout::{with_timeout, TimeoutGuard};
