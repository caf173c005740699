//! Method-as-data dispatch.
//!
//! Unlike the per-verb methods on [`ApiClient`], a dispatched request grants
//! the refresh hook a budget equal to `retries` instead of the fixed default.

use crate::config::ConfigOverlay;
use crate::transport::Method;
use crate::Result;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::core::ApiClient;
use super::execution::Call;

/// Builder for a request whose method is given as a string.
pub struct RequestBuilder<'a> {
    pub(crate) client: &'a ApiClient,
    pub(crate) method: String,
    pub(crate) url: String,
    pub(crate) body: Option<Value>,
    pub(crate) auth_token: Option<String>,
    pub(crate) content_type: Option<String>,
    pub(crate) overlay: ConfigOverlay,
}

impl<'a> RequestBuilder<'a> {
    pub(crate) fn new(client: &'a ApiClient, method: String, url: String) -> Self {
        Self {
            client,
            method,
            url,
            body: None,
            auth_token: None,
            content_type: None,
            overlay: ConfigOverlay::default(),
        }
    }

    /// JSON payload; ignored for GET and DELETE.
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Per-request configuration, overlaid on the client's.
    pub fn config(mut self, overlay: ConfigOverlay) -> Self {
        self.overlay = overlay;
        self
    }

    pub async fn send(self) -> Result<Value> {
        let method: Method = self.method.parse()?;
        let config = self.client.config().merged(&self.overlay);

        let mut call = Call::new(method, &self.url, self.auth_token.as_deref());
        if method.has_body() {
            if let Some(body) = &self.body {
                call = call.with_json_body(body)?;
            }
            call = call.with_content_type(self.content_type.as_deref());
        }

        self.client.dispatch(call, config).await
    }

    pub async fn send_as<T: DeserializeOwned>(self) -> Result<T> {
        let value = self.send().await?;
        Ok(serde_json::from_value(value)?)
    }
}
