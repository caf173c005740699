//! Retry orchestration.
//!
//! Drives an operation through at most `retries + 1` attempts with a fixed
//! delay between them. When the last regular attempt fails the refresh hook
//! runs once (budget permitting) and the run ends with
//! [`Error::MaxRetriesExceeded`].

use super::refresh::{log_refresh, RefreshHook};
use crate::config::ApiConfig;
use crate::telemetry::{noop_sink, report_event, AttemptEvent, EventSink};
use crate::{Error, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const DEFAULT_REFRESH_LIMIT: u32 = 3;

/// Largest usable retry count. The failed-attempt counter must be able to
/// reach `retries + 1` for the loop to end.
pub const MAX_RETRIES: u32 = u32::MAX - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub delay: Duration,
    pub refresh_limit: u32,
}

impl RetryPolicy {
    /// `retries` above [`MAX_RETRIES`] is clamped.
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self {
            retries: retries.min(MAX_RETRIES),
            delay,
            refresh_limit: DEFAULT_REFRESH_LIMIT,
        }
    }

    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new(config.retries, config.retry_delay)
    }

    pub fn with_refresh_limit(mut self, limit: u32) -> Self {
        self.refresh_limit = limit;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.effective_retries() + 1
    }

    fn effective_retries(&self) -> u32 {
        self.retries.min(MAX_RETRIES)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ApiConfig::default())
    }
}

/// Per-run bookkeeping. `attempt` counts failed attempts so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryState {
    pub attempt: u32,
    pub refresh_count: u32,
}

pub struct RetryOrchestrator {
    policy: RetryPolicy,
    refresh: Arc<dyn RefreshHook>,
    events: Arc<dyn EventSink>,
    request_id: String,
}

impl RetryOrchestrator {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            refresh: log_refresh(),
            events: noop_sink(),
            request_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_refresh_hook(mut self, hook: Arc<dyn RefreshHook>) -> Self {
        self.refresh = hook;
        self
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = id.into();
        self
    }

    async fn emit(&self, event: AttemptEvent) {
        report_event(self.events.as_ref(), event).await;
    }

    /// Run `operation` until it succeeds or the budget is exhausted.
    ///
    /// Attempts are strictly sequential: the next attempt starts only after
    /// the previous one settled and its delay (or refresh) completed.
    /// Non-retryable errors are returned as-is after the attempt that raised
    /// them.
    pub async fn run<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let policy = self.policy;
        let retries = policy.effective_retries();
        let max_attempts = policy.max_attempts();
        let started = Instant::now();
        let mut state = RetryState::default();
        let mut last_error: Option<Error> = None;

        while state.attempt <= retries {
            debug!(
                request_id = %self.request_id,
                attempt = state.attempt + 1,
                max_attempts,
                "starting attempt"
            );
            self.emit(AttemptEvent::AttemptStarted {
                request_id: self.request_id.clone(),
                attempt: state.attempt,
                max_attempts,
            })
            .await;

            let err = match operation().await {
                Ok(value) => {
                    self.emit(AttemptEvent::Succeeded {
                        request_id: self.request_id.clone(),
                        attempts: state.attempt + 1,
                        duration_ms: started.elapsed().as_millis() as u64,
                    })
                    .await;
                    return Ok(value);
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => e,
            };

            state.attempt += 1;
            warn!(
                request_id = %self.request_id,
                attempt = state.attempt,
                retries_left = retries.saturating_sub(state.attempt),
                error = %err,
                "attempt failed"
            );
            self.emit(AttemptEvent::AttemptFailed {
                request_id: self.request_id.clone(),
                attempt: state.attempt - 1,
                error: err.to_string(),
                status: err.status(),
                timed_out: err.is_timeout(),
            })
            .await;
            last_error = Some(err);

            if state.attempt <= retries {
                self.emit(AttemptEvent::RetryScheduled {
                    request_id: self.request_id.clone(),
                    attempt: state.attempt,
                    delay_ms: policy.delay.as_millis() as u64,
                })
                .await;
                tokio::time::sleep(policy.delay).await;
            }

            if state.attempt > retries && state.refresh_count < policy.refresh_limit {
                state.refresh_count += 1;
                info!(
                    request_id = %self.request_id,
                    refresh_count = state.refresh_count,
                    "retry limit reached, refreshing"
                );
                self.emit(AttemptEvent::RefreshInvoked {
                    request_id: self.request_id.clone(),
                    refresh_count: state.refresh_count,
                })
                .await;
                self.refresh.refresh().await?;
            }
        }

        self.emit(AttemptEvent::Exhausted {
            request_id: self.request_id.clone(),
            attempts: state.attempt,
            refreshes: state.refresh_count,
        })
        .await;

        let last_error = match last_error {
            Some(e) => e,
            None => Error::runtime_with_context(
                "retry loop ended without an attempt",
                crate::ErrorContext::new().with_source("retry_orchestrator"),
            ),
        };
        Err(Error::MaxRetriesExceeded {
            attempts: state.attempt,
            refreshes: state.refresh_count,
            last_error: Box::new(last_error),
        })
    }
}

/// Shorthand for running `operation` under `policy` with the default hook and sink.
pub async fn with_retry<F, Fut, T>(policy: RetryPolicy, operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    RetryOrchestrator::new(policy).run(operation).await
}
