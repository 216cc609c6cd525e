//! TTL cache in front of the sitting action list
//!
//! The cache is injected through `AppState` rather than living in module
//! state, and the TTL is a constructor argument so tests can shorten or
//! disable it. Entries expire after the TTL; `invalidate` drops an entry
//! eagerly when a write changes the backlog.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Default TTL for cached GET responses.
pub const SITTING_CACHE_TTL: Duration = Duration::from_secs(60);

struct CacheEntry {
    inserted_at: Instant,
    value: Value,
}

/// Short-lived response cache keyed by route.
#[derive(Clone)]
pub struct SittingCache {
    ttl: Duration,
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl SittingCache {
    /// Create a cache with the given TTL. A zero TTL disables caching.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Fetch a cached value if present and not expired.
    pub async fn get(&self, key: &str) -> Option<Value> {
        if self.ttl.is_zero() {
            return None;
        }

        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if entry.inserted_at.elapsed() < self.ttl {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    /// Store a value under the key, replacing any previous entry.
    pub async fn put(&self, key: &str, value: Value) {
        if self.ttl.is_zero() {
            return;
        }

        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            CacheEntry {
                inserted_at: Instant::now(),
                value,
            },
        );
    }

    /// Drop the entry for a key, if any.
    pub async fn invalidate(&self, key: &str) {
        let mut entries = self.entries.write().await;
        entries.remove(key);
    }
}
