//! Time-boxed cache of the broker runtime configuration.
//!
//! Shared by every Topic pass in the process. A refresh builds a new snapshot
//! and swaps it in whole; readers holding the previous `Arc` keep a consistent
//! view. Concurrent passes that both see an expired entry may both fetch.

use super::error::PulsarResult;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

struct CachedConfig {
    config: Arc<Map<String, Value>>,
    fetched_at: Instant,
}

/// Broker runtime configuration, trusted for `ttl` after each fetch
pub struct RuntimeConfigCache {
    ttl: Duration,
    entry: RwLock<Option<Arc<CachedConfig>>>,
}

impl RuntimeConfigCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: RwLock::new(None),
        }
    }

    /// Cached configuration if fetched less than `ttl` ago.
    pub fn fresh(&self) -> Option<Arc<Map<String, Value>>> {
        let entry = self.entry.read().clone()?;
        (entry.fetched_at.elapsed() < self.ttl).then(|| entry.config.clone())
    }

    /// Serve from cache, or run `fetch` and store its result.
    ///
    /// A failed fetch leaves the previous entry untouched.
    pub async fn get_or_fetch<F, Fut>(&self, fetch: F) -> PulsarResult<Arc<Map<String, Value>>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = PulsarResult<Map<String, Value>>>,
    {
        if let Some(config) = self.fresh() {
            return Ok(config);
        }

        let config = Arc::new(fetch().await?);
        *self.entry.write() = Some(Arc::new(CachedConfig {
            config: config.clone(),
            fetched_at: Instant::now(),
        }));
        tracing::debug!(keys = config.len(), "Refreshed broker runtime configuration");

        Ok(config)
    }
}
