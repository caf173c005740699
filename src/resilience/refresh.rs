//! Refresh hooks run once the retry budget is spent.

use crate::Result;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tracing::info;

/// Side-effecting step (typically credential or session renewal) invoked by
/// the retry orchestrator after the last regular attempt fails.
///
/// An error returned here ends the orchestrator run with that error.
#[async_trait]
pub trait RefreshHook: Send + Sync {
    async fn refresh(&self) -> Result<()>;
}

/// Default hook: records that a refresh was due and does nothing else.
pub struct LogRefresh;

#[async_trait]
impl RefreshHook for LogRefresh {
    async fn refresh(&self) -> Result<()> {
        info!("refresh requested; no refresh hook configured");
        Ok(())
    }
}

pub fn log_refresh() -> Arc<dyn RefreshHook> {
    Arc::new(LogRefresh)
}

/// Adapts an async closure into a [`RefreshHook`].
pub struct FnRefreshHook<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> RefreshHook for FnRefreshHook<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send,
{
    async fn refresh(&self) -> Result<()> {
        (self.f)().await
    }
}

/// ```rust
/// use apic::resilience::refresh_fn;
///
/// let hook = refresh_fn(|| async {
///     // re-authenticate here
///     Ok(())
/// });
/// # let _ = hook;
/// ```
pub fn refresh_fn<F, Fut>(f: F) -> Arc<dyn RefreshHook>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(FnRefreshHook { f })
}
