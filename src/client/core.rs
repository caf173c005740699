use crate::cache::{CacheEntry, CacheStore};
use crate::config::{ApiConfig, ConfigOverlay};
use crate::resilience::RefreshHook;
use crate::telemetry::EventSink;
use crate::transport::{Headers, Method, Transport};
use crate::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::builder::ApiClientBuilder;
use super::dispatch::RequestBuilder;
use super::execution::{Call, Executor};

/// Request facade: one cache, one configuration, one header set.
///
/// Clones share the transport and the cache store; configuration and custom
/// headers are copied, so `set_config` on a clone does not affect the original.
#[derive(Clone)]
pub struct ApiClient {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) cache: CacheStore,
    pub(crate) config: ApiConfig,
    pub(crate) headers: Headers,
    pub(crate) refresh: Arc<dyn RefreshHook>,
    pub(crate) events: Arc<dyn EventSink>,
    pub(crate) abort_on_timeout: bool,
}

impl ApiClient {
    /// Client with default configuration over a `reqwest` transport.
    pub fn new() -> Result<Self> {
        ApiClientBuilder::new().build()
    }

    /// Client whose configuration is `overlay` applied to the defaults.
    pub fn with_config(overlay: ConfigOverlay) -> Result<Self> {
        ApiClientBuilder::new().config(overlay).build()
    }

    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::new()
    }

    /// Executor for one call; facade calls use `config.timeout` as their deadline.
    pub(crate) fn executor(&self, config: ApiConfig) -> Executor {
        let timeout = config.timeout;
        Executor::new(Arc::clone(&self.transport), self.cache.clone())
            .with_config(config)
            .with_timeout(timeout)
            .with_headers(self.headers.clone())
            .with_refresh_hook(Arc::clone(&self.refresh))
            .with_event_sink(Arc::clone(&self.events))
            .abort_on_timeout(self.abort_on_timeout)
    }

    pub async fn get(&self, url: &str, auth_token: Option<&str>) -> Result<Value> {
        self.executor(self.config.clone())
            .fetch(url, auth_token)
            .await
    }

    /// GET and deserialize the payload into `T`.
    pub async fn get_as<T: DeserializeOwned>(&self, url: &str, auth_token: Option<&str>) -> Result<T> {
        let value = self.get(url, auth_token).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// POST `body` as JSON. `content_type` defaults to `application/json`.
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        auth_token: Option<&str>,
        content_type: Option<&str>,
    ) -> Result<Value> {
        self.executor(self.config.clone())
            .post(url, body, auth_token, content_type)
            .await
    }

    pub async fn put<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        auth_token: Option<&str>,
        content_type: Option<&str>,
    ) -> Result<Value> {
        self.executor(self.config.clone())
            .put_or_patch(Method::Put, url, body, auth_token, content_type)
            .await
    }

    pub async fn patch<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        auth_token: Option<&str>,
        content_type: Option<&str>,
    ) -> Result<Value> {
        self.executor(self.config.clone())
            .put_or_patch(Method::Patch, url, body, auth_token, content_type)
            .await
    }

    pub async fn delete(&self, url: &str, auth_token: Option<&str>) -> Result<Value> {
        self.executor(self.config.clone())
            .delete(url, auth_token)
            .await
    }

    /// Build a request whose method is only known at runtime.
    ///
    /// ```rust,no_run
    /// # async fn demo(client: &apic::ApiClient) -> apic::Result<()> {
    /// let created = client
    ///     .request("post", "https://api.example.com/items")
    ///     .body(serde_json::json!({"name": "widget"}))
    ///     .auth_token("secret")
    ///     .send()
    ///     .await?;
    /// # let _ = created;
    /// # Ok(())
    /// # }
    /// ```
    pub fn request(&self, method: impl Into<String>, url: impl Into<String>) -> RequestBuilder<'_> {
        RequestBuilder::new(self, method.into(), url.into())
    }

    pub(crate) async fn dispatch(&self, call: Call, config: ApiConfig) -> Result<Value> {
        let refresh_limit = config.retries;
        self.executor(config).execute(call, Some(refresh_limit)).await
    }

    /// Overlay `overlay` onto the current configuration.
    pub fn set_config(&mut self, overlay: ConfigOverlay) {
        self.config = self.config.merged(&overlay);
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Replace the persistent custom headers sent with every request.
    pub fn set_headers(&mut self, headers: Headers) {
        self.headers = headers;
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Raw cache contents, stale entries included.
    pub fn cache_snapshot(&self) -> HashMap<String, CacheEntry> {
        self.cache.snapshot()
    }

    /// Drop the cached response for `url`, or everything when `url` is `None`.
    pub fn invalidate_cache(&self, url: Option<&str>) -> usize {
        self.cache.invalidate(url)
    }

    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("transport", &self.transport.name())
            .field("config", &self.config)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("cache", &self.cache)
            .finish()
    }
}
