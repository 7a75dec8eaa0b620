//! Key-value cache store.
//!
//! [`CacheBackend`] is the fallible capability set a backing store offers.
//! [`KeyValueCache`] wraps one backend and turns every failure into "absent"
//! or a no-op, so callers never see a cache error.

mod memory;
mod redis_store;

pub use self::memory::MemoryBackend;
pub use self::redis_store::{RedisBackend, SharedRedis};

use crate::{CacheError, CacheMetrics, CacheResult};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Backing store operations
#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Get an unexpired value
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Store a value that expires `ttl_secs` from now, replacing any previous value
    async fn set_with_expiry(&self, key: &str, value: &str, ttl_secs: u64) -> CacheResult<()>;

    /// Delete one key, returning how many entries were removed
    async fn delete(&self, key: &str) -> CacheResult<usize>;

    /// Delete every key matching a `*` glob pattern
    async fn delete_by_pattern(&self, pattern: &str) -> CacheResult<usize>;

    /// Delete a batch of keys in one round trip, returning the count removed per key
    async fn pipeline_delete(&self, keys: &[&str]) -> CacheResult<Vec<usize>>;
}

/// Fail-open cache client shared by the application
#[derive(Clone)]
pub struct KeyValueCache {
    backend: Arc<dyn CacheBackend>,
    metrics: CacheMetrics,
}

impl std::fmt::Debug for KeyValueCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyValueCache")
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl KeyValueCache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend,
            metrics: CacheMetrics::new(),
        }
    }

    /// Cache backed by a fresh in-process map
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    fn swallow(&self, op: &str, key: &str, err: &CacheError) {
        warn!(
            backend = self.backend.name(),
            op = op,
            key = %key,
            error = %err,
            "Cache operation failed, continuing without cache"
        );
        self.metrics.record_error(key, err.kind());
    }

    /// Get a raw value; backend failures read as a miss
    pub async fn get(&self, key: &str) -> Option<String> {
        match self.backend.get(key).await {
            Ok(Some(value)) => {
                debug!(key = %key, "Cache hit");
                self.metrics.record_hit(key);
                Some(value)
            }
            Ok(None) => {
                debug!(key = %key, "Cache miss");
                self.metrics.record_miss(key);
                None
            }
            Err(e) => {
                self.swallow("get", key, &e);
                None
            }
        }
    }

    /// Store a raw value. Returns whether the write landed.
    pub async fn set_with_expiry(&self, key: &str, value: &str, ttl_secs: u64) -> bool {
        match self.backend.set_with_expiry(key, value, ttl_secs).await {
            Ok(()) => {
                debug!(key = %key, ttl = ttl_secs, "Cache set");
                self.metrics.record_write(key);
                true
            }
            Err(e) => {
                self.swallow("set", key, &e);
                false
            }
        }
    }

    pub async fn delete(&self, key: &str) -> usize {
        match self.backend.delete(key).await {
            Ok(deleted) => {
                debug!(key = %key, deleted = deleted, "Cache delete");
                self.metrics.record_invalidations(key, deleted);
                deleted
            }
            Err(e) => {
                self.swallow("delete", key, &e);
                0
            }
        }
    }

    pub async fn delete_by_pattern(&self, pattern: &str) -> usize {
        match self.backend.delete_by_pattern(pattern).await {
            Ok(deleted) => {
                debug!(pattern = %pattern, deleted = deleted, "Cache pattern delete");
                self.metrics.record_invalidations(pattern, deleted);
                deleted
            }
            Err(e) => {
                self.swallow("delete_by_pattern", pattern, &e);
                0
            }
        }
    }

    pub async fn pipeline_delete(&self, keys: &[&str]) -> usize {
        if keys.is_empty() {
            return 0;
        }

        match self.backend.pipeline_delete(keys).await {
            Ok(counts) => {
                for (key, count) in keys.iter().zip(&counts) {
                    self.metrics.record_invalidations(key, *count);
                }
                let deleted: usize = counts.iter().sum();
                debug!(count = keys.len(), deleted = deleted, "Cache pipeline delete");
                deleted
            }
            Err(e) => {
                self.swallow("pipeline_delete", keys[0], &e);
                0
            }
        }
    }

    /// Get and decode a JSON value. Undecodable entries are deleted and read as a miss.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key).await?;
        match serde_json::from_str::<T>(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                self.swallow("decode", key, &CacheError::Serialization(e));
                self.delete(key).await;
                None
            }
        }
    }

    /// Encode and store a JSON value
    pub async fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl_secs: u64) -> bool {
        match serde_json::to_string(value) {
            Ok(data) => self.set_with_expiry(key, &data, ttl_secs).await,
            Err(e) => {
                self.swallow("encode", key, &CacheError::Serialization(e));
                false
            }
        }
    }
}
