//! Verb executors: one network attempt per operation, wrapped in the retry
//! orchestrator when retries are enabled.

use crate::cache::CacheStore;
use crate::config::{ApiConfig, DEFAULT_CALL_TIMEOUT};
use crate::resilience::{log_refresh, RefreshHook, RetryOrchestrator, RetryPolicy, TimeoutGuard};
use crate::telemetry::{noop_sink, report_event, AttemptEvent, EventSink};
use crate::transport::headers::JSON_CONTENT_TYPE;
use crate::transport::{build_headers, merge_headers, Headers, HttpRequest, Method, Transport};
use crate::{Error, Result};
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

/// Correlation header attached to every attempt of a call.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// A shaped call: everything the pipeline needs besides the configuration.
#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub method: Method,
    pub url: String,
    pub body: Option<Bytes>,
    pub auth_token: Option<String>,
    pub content_type: String,
}

impl Call {
    pub fn new(method: Method, url: &str, auth_token: Option<&str>) -> Self {
        Self {
            method,
            url: url.to_string(),
            body: None,
            auth_token: auth_token.map(str::to_string),
            content_type: JSON_CONTENT_TYPE.to_string(),
        }
    }

    pub fn with_json_body<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.body = Some(Bytes::from(serde_json::to_vec(body)?));
        Ok(self)
    }

    pub fn with_content_type(mut self, content_type: Option<&str>) -> Self {
        if let Some(ct) = content_type {
            self.content_type = ct.to_string();
        }
        self
    }
}

/// Low-level request executor.
///
/// Driven directly, an executor applies [`DEFAULT_CALL_TIMEOUT`] to every
/// call regardless of `config.timeout`; [`crate::ApiClient`] builds its
/// executors with the configured timeout instead.
#[derive(Clone)]
pub struct Executor {
    transport: Arc<dyn Transport>,
    cache: CacheStore,
    config: ApiConfig,
    timeout: Duration,
    custom_headers: Headers,
    refresh: Arc<dyn RefreshHook>,
    events: Arc<dyn EventSink>,
    abort_on_timeout: bool,
}

impl Executor {
    pub fn new(transport: Arc<dyn Transport>, cache: CacheStore) -> Self {
        Self {
            transport,
            cache,
            config: ApiConfig::default(),
            timeout: DEFAULT_CALL_TIMEOUT,
            custom_headers: Headers::new(),
            refresh: log_refresh(),
            events: noop_sink(),
            abort_on_timeout: false,
        }
    }

    pub fn with_config(mut self, config: ApiConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.custom_headers = headers;
        self
    }

    pub fn with_refresh_hook(mut self, hook: Arc<dyn RefreshHook>) -> Self {
        self.refresh = hook;
        self
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    pub fn abort_on_timeout(mut self, abort: bool) -> Self {
        self.abort_on_timeout = abort;
        self
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn fetch(&self, url: &str, auth_token: Option<&str>) -> Result<Value> {
        self.execute(Call::new(Method::Get, url, auth_token), None)
            .await
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        auth_token: Option<&str>,
        content_type: Option<&str>,
    ) -> Result<Value> {
        let call = Call::new(Method::Post, url, auth_token)
            .with_json_body(body)?
            .with_content_type(content_type);
        self.execute(call, None).await
    }

    /// PUT or PATCH; any other method fails with [`Error::UnsupportedMethod`].
    pub async fn put_or_patch<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: &B,
        auth_token: Option<&str>,
        content_type: Option<&str>,
    ) -> Result<Value> {
        if !matches!(method, Method::Put | Method::Patch) {
            return Err(Error::UnsupportedMethod(method.to_string()));
        }
        let call = Call::new(method, url, auth_token)
            .with_json_body(body)?
            .with_content_type(content_type);
        self.execute(call, None).await
    }

    pub async fn delete(&self, url: &str, auth_token: Option<&str>) -> Result<Value> {
        self.execute(Call::new(Method::Delete, url, auth_token), None)
            .await
    }

    /// Run `call` to completion. `refresh_limit` overrides the orchestrator's
    /// default refresh budget.
    pub(crate) async fn execute(&self, call: Call, refresh_limit: Option<u32>) -> Result<Value> {
        let request_id = Uuid::new_v4().to_string();
        let request = self.prepare(&call, &request_id)?;

        debug!(
            request_id = %request_id,
            method = %call.method,
            url = %call.url,
            retry = self.config.enable_retry,
            "executing request"
        );

        let (this, req, key, id) = (self, &request, call.url.as_str(), request_id.as_str());
        let operation = move || this.attempt(req, key, id);

        if !self.config.enable_retry {
            return operation().await;
        }

        let mut policy = RetryPolicy::from_config(&self.config);
        if let Some(limit) = refresh_limit {
            policy = policy.with_refresh_limit(limit);
        }
        RetryOrchestrator::new(policy)
            .with_refresh_hook(self.refresh.clone())
            .with_event_sink(self.events.clone())
            .with_request_id(request_id.as_str())
            .run(operation)
            .await
    }

    fn prepare(&self, call: &Call, request_id: &str) -> Result<HttpRequest> {
        let mut headers = merge_headers(
            &self.custom_headers,
            build_headers(&call.content_type, call.auth_token.as_deref()),
        );
        headers.insert(REQUEST_ID_HEADER.to_string(), request_id.to_string());

        let mut request = HttpRequest::new(call.method, &call.url)?.with_headers(headers);
        if let Some(body) = &call.body {
            request = request.with_body(body.clone());
        }
        Ok(request)
    }

    /// One attempt: cache lookup (GET only), timed network call, status check,
    /// JSON parse, cache store (GET only).
    async fn attempt(&self, request: &HttpRequest, cache_key: &str, request_id: &str) -> Result<Value> {
        let use_cache = request.method == Method::Get && self.config.enable_cache;

        if use_cache {
            if let Some(value) = self
                .cache
                .get_fresh(cache_key, self.config.cache_expiration_time)
            {
                debug!(request_id, url = cache_key, "returning cached data");
                report_event(
                    self.events.as_ref(),
                    AttemptEvent::CacheHit {
                        request_id: request_id.to_string(),
                        key: cache_key.to_string(),
                    },
                )
                .await;
                return Ok(value);
            }
        }

        let transport = Arc::clone(&self.transport);
        let outgoing = request.clone();
        let start = Instant::now();
        let response = TimeoutGuard::new(self.timeout)
            .abort_on_timeout(self.abort_on_timeout)
            .run(async move { transport.send(outgoing).await })
            .await?;

        let duration_ms = start.elapsed().as_millis() as u64;
        if !response.is_success() {
            info!(
                request_id,
                method = %request.method,
                http_status = response.status,
                duration_ms,
                "request failed"
            );
            return Err(Error::http(response.status, response.text()));
        }

        let value = response.json()?;
        if use_cache {
            self.cache.set(cache_key, value.clone());
        }

        debug!(
            request_id,
            method = %request.method,
            http_status = response.status,
            duration_ms,
            "request completed"
        );
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::HttpResponse;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Replies with scripted responses in order, repeating the last one.
    struct Scripted {
        replies: Mutex<Vec<(u16, &'static str)>>,
        latency: Duration,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl Scripted {
        fn new(replies: Vec<(u16, &'static str)>) -> Arc<Self> {
            Self::with_latency(replies, Duration::ZERO)
        }

        fn with_latency(replies: Vec<(u16, &'static str)>, latency: Duration) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies),
                latency,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }

        fn last(&self) -> HttpRequest {
            self.seen.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
            self.seen.lock().unwrap().push(request);
            let (status, body) = {
                let mut replies = self.replies.lock().unwrap();
                if replies.len() > 1 {
                    replies.remove(0)
                } else {
                    replies[0]
                }
            };
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            Ok(HttpResponse::new(status, body))
        }
    }

    fn executor(transport: Arc<Scripted>, config: ApiConfig) -> Executor {
        Executor::new(transport, CacheStore::new()).with_config(config)
    }

    #[test]
    fn test_direct_executor_uses_call_timeout() {
        let exec = executor(Scripted::new(vec![(200, "{}")]), ApiConfig::default());
        assert_eq!(exec.timeout(), DEFAULT_CALL_TIMEOUT);
        assert_eq!(exec.config().timeout, crate::config::DEFAULT_TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_caches_successful_response() {
        let transport = Scripted::new(vec![(200, r#"{"n": 1}"#)]);
        let exec = executor(transport.clone(), ApiConfig::default());

        let first = exec.fetch("https://api.test/items", None).await.unwrap();
        let second = exec.fetch("https://api.test/items", None).await.unwrap();

        assert_eq!(first, json!({"n": 1}));
        assert_eq!(first, second);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_refetches_after_expiration() {
        let transport = Scripted::new(vec![(200, r#"{"v": 1}"#), (200, r#"{"v": 2}"#)]);
        let config = ApiConfig::default().with_cache_expiration(Duration::from_millis(100));
        let exec = executor(transport.clone(), config);

        assert_eq!(exec.fetch("https://api.test/v", None).await.unwrap()["v"], 1);
        tokio::time::advance(Duration::from_millis(100)).await;
        assert_eq!(exec.fetch("https://api.test/v", None).await.unwrap()["v"], 2);
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_disabled_never_touches_store() {
        let transport = Scripted::new(vec![(200, "[1]")]);
        let cache = CacheStore::new();
        cache.set("https://api.test/list", json!("stale-but-present"));
        let exec = Executor::new(transport.clone(), cache.clone())
            .with_config(ApiConfig::default().with_cache(false));

        assert_eq!(exec.fetch("https://api.test/list", None).await.unwrap(), json!([1]));
        assert_eq!(exec.fetch("https://api.test/list", None).await.unwrap(), json!([1]));
        assert_eq!(transport.calls(), 2);
        assert_eq!(cache.get("https://api.test/list").unwrap().value, json!("stale-but-present"));
        assert_eq!(cache.stats().hits + cache.stats().misses, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_get_is_not_cached() {
        let transport = Scripted::new(vec![(404, "missing")]);
        let cache = CacheStore::new();
        let exec = Executor::new(transport, cache.clone())
            .with_config(ApiConfig::default().with_retry(false));

        let err = exec.fetch("https://api.test/nope", None).await.unwrap_err();
        assert!(matches!(err, Error::Http { status: 404, .. }));
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_post_sends_serialized_body_and_headers() {
        let transport = Scripted::new(vec![(201, r#"{"id": 9}"#)]);
        let mut custom = Headers::new();
        custom.insert("X-Tenant".into(), "acme".into());
        let exec = executor(transport.clone(), ApiConfig::default()).with_headers(custom);

        let out = exec
            .post("https://api.test/items", &json!({"name": "x"}), Some("tok"), None)
            .await
            .unwrap();
        assert_eq!(out["id"], 9);

        let sent = transport.last();
        assert_eq!(sent.method, Method::Post);
        assert_eq!(sent.body.unwrap(), Bytes::from_static(br#"{"name":"x"}"#));
        assert_eq!(sent.headers["Content-Type"], "application/json");
        assert_eq!(sent.headers["Authorization"], "Bearer tok");
        assert_eq!(sent.headers["X-Tenant"], "acme");
        assert!(sent.headers.contains_key(REQUEST_ID_HEADER));
    }

    #[tokio::test(start_paused = true)]
    async fn test_post_does_not_cache() {
        let transport = Scripted::new(vec![(200, "{}")]);
        let cache = CacheStore::new();
        let exec = Executor::new(transport.clone(), cache.clone());
        exec.post("https://api.test/p", &json!(1), None, None).await.unwrap();
        exec.post("https://api.test/p", &json!(1), None, None).await.unwrap();
        assert_eq!(transport.calls(), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_or_patch_rejects_other_methods() {
        let transport = Scripted::new(vec![(200, "{}")]);
        let exec = executor(transport.clone(), ApiConfig::default());
        let err = exec
            .put_or_patch(Method::Post, "https://api.test/x", &json!({}), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedMethod(_)));
        assert_eq!(transport.calls(), 0);

        exec.put_or_patch(Method::Patch, "https://api.test/x", &json!({"a": 1}), None, Some("application/merge-patch+json"))
            .await
            .unwrap();
        let sent = transport.last();
        assert_eq!(sent.method, Method::Patch);
        assert_eq!(sent.headers["Content-Type"], "application/merge-patch+json");
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_retries_non_2xx_before_surfacing() {
        let transport = Scripted::new(vec![(500, "oops")]);
        let config = ApiConfig::default()
            .with_retries(2)
            .with_retry_delay(Duration::from_millis(10));
        let exec = executor(transport.clone(), config);

        let err = exec.delete("https://api.test/items/1", None).await.unwrap_err();
        assert_eq!(transport.calls(), 3);
        assert_eq!(err.status(), Some(500));
        assert!(matches!(err, Error::MaxRetriesExceeded { attempts: 3, .. }));
        assert!(transport.last().body.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_disabled_runs_once() {
        let transport = Scripted::new(vec![(503, "")]);
        let exec = executor(transport.clone(), ApiConfig::default().with_retry(false));
        let err = exec.delete("https://api.test/items/1", None).await.unwrap_err();
        assert!(matches!(err, Error::Http { status: 503, .. }));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_shorter_than_latency() {
        let transport = Scripted::with_latency(vec![(200, "{}")], Duration::from_millis(500));
        let exec = executor(transport.clone(), ApiConfig::default().with_retry(false))
            .with_timeout(Duration::from_millis(100));
        let err = exec.fetch("https://api.test/slow", None).await.unwrap_err();
        assert!(matches!(err, Error::Timeout { timeout_ms: 100 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_url_fails_without_attempts() {
        let transport = Scripted::new(vec![(200, "{}")]);
        let exec = executor(transport.clone(), ApiConfig::default());
        let err = exec.fetch("not a url", None).await.unwrap_err();
        assert!(matches!(err, Error::InvalidUrl { .. }));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_rechecks_cache_between_attempts() {
        let transport = Scripted::new(vec![(500, ""), (200, "{}")]);
        let cache = CacheStore::new();
        let exec = Executor::new(transport.clone(), cache.clone())
            .with_config(ApiConfig::default().with_retry_delay(Duration::from_millis(50)));

        let filler = cache.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            filler.set("https://api.test/r", json!("from-elsewhere"));
        });

        let out = exec.fetch("https://api.test/r", None).await.unwrap();
        assert_eq!(out, json!("from-elsewhere"));
        assert_eq!(transport.calls(), 1);
    }
    struct RejectingSink;

    #[async_trait]
    impl EventSink for RejectingSink {
        async fn report(&self, _: AttemptEvent) -> Result<()> {
            Err(Error::runtime_with_context("sink offline", crate::ErrorContext::new()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_hit_survives_failing_event_sink() {
        let transport = Scripted::new(vec![(200, r#"{"n": 2}"#)]);
        let exec = executor(transport.clone(), ApiConfig::default())
            .with_event_sink(Arc::new(RejectingSink));

        exec.fetch("https://api.test/c", None).await.unwrap();
        let cached = exec.fetch("https://api.test/c", None).await.unwrap();
        assert_eq!(cached, json!({"n": 2}));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_auth_token_is_not_sent() {
        let transport = Scripted::new(vec![(200, "{}")]);
        let exec = executor(transport.clone(), ApiConfig::default());
        exec.delete("https://api.test/items/1", Some("")).await.unwrap();
        assert!(!transport.last().headers.contains_key("Authorization"));
    }
}
