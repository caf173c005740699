use crate::cache::CacheStore;
use crate::client::core::ApiClient;
use crate::config::{ApiConfig, ConfigOverlay};
use crate::resilience::{log_refresh, RefreshHook};
use crate::telemetry::{noop_sink, EventSink};
use crate::transport::{Headers, HttpTransport, Transport};
use crate::Result;
use std::sync::Arc;

/// Builder for [`ApiClient`].
///
/// Keep this surface area small and predictable.
pub struct ApiClientBuilder {
    config: ApiConfig,
    headers: Headers,
    transport: Option<Arc<dyn Transport>>,
    cache: Option<CacheStore>,
    refresh: Arc<dyn RefreshHook>,
    events: Arc<dyn EventSink>,
    abort_on_timeout: bool,
}

impl ApiClientBuilder {
    pub fn new() -> Self {
        Self {
            config: ApiConfig::default(),
            headers: Headers::new(),
            transport: None,
            cache: None,
            refresh: log_refresh(),
            events: noop_sink(),
            abort_on_timeout: false,
        }
    }

    /// Overlay `overlay` onto the configuration built so far.
    pub fn config(mut self, overlay: ConfigOverlay) -> Self {
        self.config = self.config.merged(&overlay);
        self
    }

    /// Replace the whole configuration.
    pub fn api_config(mut self, config: ApiConfig) -> Self {
        self.config = config;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Use a custom transport instead of the default `reqwest` one.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Share an existing cache store (e.g. between several clients).
    pub fn cache(mut self, cache: CacheStore) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Hook invoked once the retry budget is exhausted. Default only logs.
    pub fn refresh_hook(mut self, hook: Arc<dyn RefreshHook>) -> Self {
        self.refresh = hook;
        self
    }

    /// Inject an attempt event sink. Default is a no-op sink.
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    /// Abort network calls that lose the race against their deadline.
    ///
    /// Off by default: a timed-out call keeps running in the background and
    /// its result is discarded.
    pub fn abort_on_timeout(mut self, abort: bool) -> Self {
        self.abort_on_timeout = abort;
        self
    }

    pub fn build(self) -> Result<ApiClient> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(t) => t,
            None => Arc::new(HttpTransport::new()?),
        };

        Ok(ApiClient {
            transport,
            cache: self.cache.unwrap_or_default(),
            config: self.config,
            headers: self.headers,
            refresh: self.refresh,
            events: self.events,
            abort_on_timeout: self.abort_on_timeout,
        })
    }
}

impl Default for ApiClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
