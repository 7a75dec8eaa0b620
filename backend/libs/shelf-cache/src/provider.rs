//! Owner of the process-wide cache client.
//!
//! The provider is created once at startup and handed to whoever needs a
//! cache. The client is built on first access and reused afterwards;
//! [`CacheProvider::teardown`] drops it so the next access builds a new one.

use crate::store::{KeyValueCache, MemoryBackend, RedisBackend};
use crate::mutual::{MutualFriendsCache, MUTUAL_FRIENDS_CACHE};
use crate::{BackendKind, CacheConfig, PairCache, ResultCache};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

pub struct CacheProvider {
    config: CacheConfig,
    client: Mutex<Option<KeyValueCache>>,
}

impl CacheProvider {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            client: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The memoized client, built on first call.
    ///
    /// If Redis is configured but unreachable the provider falls back to an
    /// in-memory store until the next teardown.
    pub async fn client(&self) -> KeyValueCache {
        let mut slot = self.client.lock().await;
        if let Some(client) = slot.as_ref() {
            return client.clone();
        }

        let client = build_client(&self.config).await;
        info!(backend = client.backend_name(), "Cache client initialized");
        *slot = Some(client.clone());
        client
    }

    /// Result cache over the memoized client with the configured default TTL
    pub async fn result_cache(&self) -> ResultCache {
        ResultCache::with_default_ttl(self.client().await, self.config.default_ttl_secs)
    }

    /// Mutual friends pair cache with the configured pair TTL.
    ///
    /// Pair caches are process-local, so each call returns a new empty cache.
    pub fn mutual_friends_cache<E>(&self) -> MutualFriendsCache<E>
    where
        E: Clone + Send + Sync + 'static,
    {
        PairCache::with_ttl(MUTUAL_FRIENDS_CACHE, self.config.pair_ttl())
    }

    /// Drop the memoized client. Returns whether one existed.
    pub async fn teardown(&self) -> bool {
        let released = self.client.lock().await.take();
        if let Some(client) = &released {
            info!(backend = client.backend_name(), "Cache client torn down");
        }
        released.is_some()
    }

    pub async fn is_initialized(&self) -> bool {
        self.client.lock().await.is_some()
    }
}

async fn build_client(config: &CacheConfig) -> KeyValueCache {
    match config.backend_kind() {
        BackendKind::Memory => KeyValueCache::new(Arc::new(MemoryBackend::new())),
        BackendKind::Redis { url } => match RedisBackend::connect(&url).await {
            Ok(backend) => KeyValueCache::new(Arc::new(backend)),
            Err(e) => {
                error!(error = %e, "Redis cache unreachable, using in-memory cache");
                KeyValueCache::new(Arc::new(MemoryBackend::new()))
            }
        },
    }
}
