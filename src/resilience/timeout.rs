//! Deadline enforcement for a single network call.

use crate::{Error, ErrorContext, Result};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Races a call against a deadline.
///
/// The call runs as its own task. When the deadline wins, the task is left
/// running by default and whatever it eventually produces is discarded; any
/// side effect it has (a write reaching the server, say) still happens. Set
/// [`TimeoutGuard::abort_on_timeout`] to abort the task instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutGuard {
    deadline: Duration,
    abort_on_timeout: bool,
}

impl TimeoutGuard {
    pub fn new(deadline: Duration) -> Self {
        Self {
            deadline,
            abort_on_timeout: false,
        }
    }

    pub fn abort_on_timeout(mut self, abort: bool) -> Self {
        self.abort_on_timeout = abort;
        self
    }

    pub async fn run<F, T>(&self, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let mut handle = tokio::spawn(call);

        tokio::select! {
            biased;

            joined = &mut handle => match joined {
                Ok(result) => result,
                Err(e) => Err(Error::runtime_with_context(
                    "network call task failed",
                    ErrorContext::new()
                        .with_details(e.to_string())
                        .with_source("timeout_guard"),
                )),
            },
            _ = tokio::time::sleep(self.deadline) => {
                let timeout_ms = self.deadline.as_millis() as u64;
                if self.abort_on_timeout {
                    handle.abort();
                    debug!(timeout_ms, "call aborted after deadline");
                } else {
                    // Dropping the handle detaches the task.
                    debug!(timeout_ms, "deadline elapsed, call left running");
                }
                Err(Error::Timeout { timeout_ms })
            }
        }
    }
}

/// Shorthand for `TimeoutGuard::new(deadline).run(call)`.
pub async fn with_timeout<F, T>(deadline: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    TimeoutGuard::new(deadline).run(call).await
}
