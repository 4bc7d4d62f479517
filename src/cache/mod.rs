//! Optional TTL cache for Svar.
//!
//! The cache is a capability: when configured, a real backend memoizes
//! expensive generation calls; when not, [`NoopCache`] makes every lookup
//! miss and every write a no-op. Callers never branch on availability and
//! never see cache errors — a broken cache degrades to a slower pipeline,
//! not a failed one.
//!
//! Keys are built by callers from content hashes, never from raw user
//! content; values are serialized JSON.

mod sqlite;

pub use sqlite::SqliteCache;

use crate::config::{CacheSettings, Settings};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Trait for cache backends. Infallible by contract.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Look up a key. Absent, expired, and error all read as `None`.
    async fn get(&self, key: &str) -> Option<String>;

    /// Store a value with a time-to-live. Errors are swallowed.
    async fn set(&self, key: &str, value: &str, ttl: Duration);
}

/// Cache that never hits. Used when no backend is configured.
pub struct NoopCache;

#[async_trait]
impl Cache for NoopCache {
    async fn get(&self, _key: &str) -> Option<String> {
        None
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) {}
}

/// Select a cache implementation from configuration, once, at startup.
pub fn from_settings(settings: &CacheSettings) -> Arc<dyn Cache> {
    match &settings.sqlite_path {
        Some(path) => {
            let expanded = Settings::expand_path(path);
            match SqliteCache::new(&expanded) {
                Ok(cache) => Arc::new(cache),
                Err(e) => {
                    warn!("Cache unavailable ({}), continuing without caching", e);
                    Arc::new(NoopCache)
                }
            }
        }
        None => Arc::new(NoopCache),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_cache_always_misses() {
        let cache = NoopCache;
        cache.set("key", "value", Duration::from_secs(60)).await;
        assert_eq!(cache.get("key").await, None);
    }

    #[test]
    fn test_from_settings_without_path_is_noop() {
        let cache = from_settings(&CacheSettings::default());
        // Just exercise the selection; behavior is covered above.
        let _ = cache;
    }
}
