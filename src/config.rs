//! Request pipeline configuration.
//!
//! [`ApiConfig`] is the fully-resolved configuration used by a single call.
//! [`ConfigOverlay`] is the caller-supplied partial form; every field that is
//! set replaces the corresponding field of the base configuration.
//!
//! Both types serialize with camelCase keys and durations in milliseconds:
//!
//! ```rust
//! use apic::config::ConfigOverlay;
//!
//! let overlay = ConfigOverlay::from_yaml_str("retries: 5\nretryDelay: 250\n").unwrap();
//! let config = overlay.apply_to(&Default::default());
//! assert_eq!(config.retries, 5);
//! assert_eq!(config.retry_delay.as_millis(), 250);
//! ```

use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Facade-level call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Timeout used by executors that are driven directly rather than through
/// [`crate::ApiClient`].
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_millis(5_000);

pub const DEFAULT_CACHE_EXPIRATION: Duration = Duration::from_millis(5 * 60 * 1000);
pub const DEFAULT_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1_000);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    pub enable_cache: bool,
    #[serde(with = "duration_ms")]
    pub cache_expiration_time: Duration,
    pub enable_retry: bool,
    pub retries: u32,
    #[serde(with = "duration_ms")]
    pub retry_delay: Duration,
    #[serde(with = "duration_ms")]
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enable_cache: true,
            cache_expiration_time: DEFAULT_CACHE_EXPIRATION,
            enable_retry: true,
            retries: DEFAULT_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ApiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.enable_cache = enabled;
        self
    }

    pub fn with_cache_expiration(mut self, ttl: Duration) -> Self {
        self.cache_expiration_time = ttl;
        self
    }

    pub fn with_retry(mut self, enabled: bool) -> Self {
        self.enable_retry = enabled;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overlay a partial configuration, returning the merged result.
    pub fn merged(&self, overlay: &ConfigOverlay) -> Self {
        overlay.apply_to(self)
    }
}

/// Partial configuration; unset fields keep the base value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigOverlay {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_cache: Option<bool>,
    #[serde(
        default,
        with = "opt_duration_ms",
        skip_serializing_if = "Option::is_none"
    )]
    pub cache_expiration_time: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_retry: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
    #[serde(
        default,
        with = "opt_duration_ms",
        skip_serializing_if = "Option::is_none"
    )]
    pub retry_delay: Option<Duration>,
    #[serde(
        default,
        with = "opt_duration_ms",
        skip_serializing_if = "Option::is_none"
    )]
    pub timeout: Option<Duration>,
}

impl ConfigOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable_cache(mut self, enabled: bool) -> Self {
        self.enable_cache = Some(enabled);
        self
    }

    pub fn cache_expiration_time(mut self, ttl: Duration) -> Self {
        self.cache_expiration_time = Some(ttl);
        self
    }

    pub fn enable_retry(mut self, enabled: bool) -> Self {
        self.enable_retry = Some(enabled);
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn apply_to(&self, base: &ApiConfig) -> ApiConfig {
        ApiConfig {
            enable_cache: self.enable_cache.unwrap_or(base.enable_cache),
            cache_expiration_time: self
                .cache_expiration_time
                .unwrap_or(base.cache_expiration_time),
            enable_retry: self.enable_retry.unwrap_or(base.enable_retry),
            retries: self.retries.unwrap_or(base.retries),
            retry_delay: self.retry_delay.unwrap_or(base.retry_delay),
            timeout: self.timeout.unwrap_or(base.timeout),
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| {
            Error::configuration_with_context(
                "Failed to parse JSON configuration overlay",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("config_overlay"),
            )
        })
    }

    pub fn from_yaml_str(s: &str) -> Result<Self> {
        serde_yaml::from_str(s).map_err(|e| {
            Error::configuration_with_context(
                "Failed to parse YAML configuration overlay",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("config_overlay"),
            )
        })
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

mod opt_duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        d: &Option<Duration>,
        s: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> std::result::Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}
