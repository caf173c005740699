//! Attempt telemetry.
//!
//! Callers only ever see the final outcome of a request. Everything that
//! happened on the way there (failed attempts, delays, refreshes, cache hits)
//! is reported as an [`AttemptEvent`] to the client's [`EventSink`].
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`AttemptEvent`] | Typed pipeline event |
//! | [`EventSink`] | Trait for event destinations |
//! | [`NoopEventSink`] | Default sink, discards everything |
//! | [`InMemoryEventSink`] | Bounded in-memory sink for tests and diagnostics |

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttemptEvent {
    AttemptStarted {
        request_id: String,
        attempt: u32,
        max_attempts: u32,
    },
    AttemptFailed {
        request_id: String,
        attempt: u32,
        error: String,
        status: Option<u16>,
        timed_out: bool,
    },
    RetryScheduled {
        request_id: String,
        attempt: u32,
        delay_ms: u64,
    },
    RefreshInvoked {
        request_id: String,
        refresh_count: u32,
    },
    CacheHit {
        request_id: String,
        key: String,
    },
    Succeeded {
        request_id: String,
        attempts: u32,
        duration_ms: u64,
    },
    Exhausted {
        request_id: String,
        attempts: u32,
        refreshes: u32,
    },
}

impl AttemptEvent {
    pub fn request_id(&self) -> &str {
        match self {
            AttemptEvent::AttemptStarted { request_id, .. }
            | AttemptEvent::AttemptFailed { request_id, .. }
            | AttemptEvent::RetryScheduled { request_id, .. }
            | AttemptEvent::RefreshInvoked { request_id, .. }
            | AttemptEvent::CacheHit { request_id, .. }
            | AttemptEvent::Succeeded { request_id, .. }
            | AttemptEvent::Exhausted { request_id, .. } => request_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AttemptEvent::AttemptStarted { .. } => "attempt_started",
            AttemptEvent::AttemptFailed { .. } => "attempt_failed",
            AttemptEvent::RetryScheduled { .. } => "retry_scheduled",
            AttemptEvent::RefreshInvoked { .. } => "refresh_invoked",
            AttemptEvent::CacheHit { .. } => "cache_hit",
            AttemptEvent::Succeeded { .. } => "succeeded",
            AttemptEvent::Exhausted { .. } => "exhausted",
        }
    }
}

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn report(&self, event: AttemptEvent) -> Result<()>;
}

pub struct NoopEventSink;

#[async_trait]
impl EventSink for NoopEventSink {
    async fn report(&self, _: AttemptEvent) -> Result<()> {
        Ok(())
    }
}

pub fn noop_sink() -> Arc<dyn EventSink> {
    Arc::new(NoopEventSink)
}

/// Report `event`, logging a sink failure instead of surfacing it.
pub async fn report_event(sink: &dyn EventSink, event: AttemptEvent) {
    let kind = event.kind();
    if let Err(e) = sink.report(event).await {
        debug!(event = kind, error = %e, "event sink rejected attempt event");
    }
}

/// Keeps the most recent `max_events` events.
pub struct InMemoryEventSink {
    events: RwLock<Vec<AttemptEvent>>,
    max_events: usize,
}

impl InMemoryEventSink {
    pub fn new(max: usize) -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            max_events: max.max(1),
        }
    }

    pub fn events(&self) -> Vec<AttemptEvent> {
        self.events.read().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn events_by_request(&self, req_id: &str) -> Vec<AttemptEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.request_id() == req_id)
            .collect()
    }

    /// Event kinds in arrival order; handy for asserting on sequences.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events().iter().map(AttemptEvent::kind).collect()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.write() {
            events.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.events.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryEventSink {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl EventSink for InMemoryEventSink {
    async fn report(&self, event: AttemptEvent) -> Result<()> {
        if let Ok(mut events) = self.events.write() {
            events.push(event);
            if events.len() > self.max_events {
                events.remove(0);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(id: &str, attempt: u32) -> AttemptEvent {
        AttemptEvent::AttemptStarted {
            request_id: id.into(),
            attempt,
            max_attempts: 2,
        }
    }

    #[tokio::test]
    async fn test_in_memory_sink_is_bounded() {
        let sink = InMemoryEventSink::new(2);
        for i in 0..3 {
            sink.report(started("r1", i)).await.unwrap();
        }
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.events()[0], started("r1", 1));
    }

    #[tokio::test]
    async fn test_filter_by_request() {
        let sink = InMemoryEventSink::default();
        sink.report(started("a", 0)).await.unwrap();
        sink.report(started("b", 0)).await.unwrap();
        sink.report(AttemptEvent::RefreshInvoked {
            request_id: "a".into(),
            refresh_count: 1,
        })
        .await
        .unwrap();

        let a = sink.events_by_request("a");
        assert_eq!(a.len(), 2);
        assert_eq!(a[1].kind(), "refresh_invoked");

        sink.clear();
        assert!(sink.is_empty());
    }

    struct RejectingSink;

    #[async_trait]
    impl EventSink for RejectingSink {
        async fn report(&self, _: AttemptEvent) -> Result<()> {
            Err(crate::Error::runtime_with_context(
                "sink offline",
                crate::ErrorContext::new(),
            ))
        }
    }

    #[tokio::test]
    async fn test_report_event_swallows_sink_errors() {
        report_event(&RejectingSink, started("r", 0)).await;

        let sink = InMemoryEventSink::default();
        report_event(&sink, started("r", 0)).await;
        assert_eq!(sink.kinds(), vec!["attempt_started"]);
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let json = serde_json::to_value(AttemptEvent::CacheHit {
            request_id: "r".into(),
            key: "https://x.test/".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "cache_hit");
        assert_eq!(json["key"], "https://x.test/");
    }
}
