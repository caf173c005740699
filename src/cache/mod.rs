//! Response caching for idempotent reads.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`CacheStore`] | Per-client map of request URL to cached JSON payload |
//! | [`CacheEntry`] | Cached payload plus the instant it was stored |
//! | [`CacheStats`] | Hit/miss/set/invalidation counters |
//!
//! Only successful GET responses are stored. Freshness is judged at read time
//! against the caller's `cache_expiration_time`; nothing is evicted in the
//! background.
//!
//! ```rust
//! use apic::cache::CacheStore;
//!
//! let store = CacheStore::new();
//! store.set("https://api.example.com/items", serde_json::json!([1, 2, 3]));
//! assert!(store.contains("https://api.example.com/items"));
//!
//! store.invalidate(None);
//! assert!(store.is_empty());
//! ```

mod store;

pub use store::{CacheEntry, CacheStats, CacheStore};
