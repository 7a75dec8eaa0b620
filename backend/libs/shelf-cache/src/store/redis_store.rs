//! Redis-backed store.

use super::CacheBackend;
use crate::pattern::redis_match_pattern;
use crate::{CacheError, CacheResult};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Pipeline};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Shared Redis connection manager
pub type SharedRedis = Arc<Mutex<ConnectionManager>>;

/// Keys fetched per SCAN round trip
const SCAN_BATCH: usize = 100;

/// Networked backend over a multiplexed connection manager
pub struct RedisBackend {
    redis: SharedRedis,
}

impl RedisBackend {
    pub fn new(redis: SharedRedis) -> Self {
        Self { redis }
    }

    /// Open a client for `redis_url` and wait for the first connection
    pub async fn connect(redis_url: &str) -> CacheResult<Self> {
        let client = Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;
        info!(backend = "redis", "Redis cache backend connected");
        Ok(Self::new(Arc::new(Mutex::new(manager))))
    }

    pub fn shared(&self) -> SharedRedis {
        self.redis.clone()
    }
}

#[async_trait::async_trait]
impl CacheBackend for RedisBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.redis.lock().await;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl_secs: u64) -> CacheResult<()> {
        let mut conn = self.redis.lock().await;
        if ttl_secs == 0 {
            conn.set::<_, _, ()>(key, value).await?;
        } else {
            conn.set_ex::<_, _, ()>(key, value, ttl_secs).await?;
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<usize> {
        let mut conn = self.redis.lock().await;
        let deleted: usize = conn.del(key).await?;
        Ok(deleted)
    }

    async fn delete_by_pattern(&self, pattern: &str) -> CacheResult<usize> {
        let match_pattern = redis_match_pattern(pattern);
        let mut conn = self.redis.lock().await;
        let mut cursor: u64 = 0;
        let mut total_deleted = 0;

        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&match_pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut *conn)
                .await?;

            if !keys.is_empty() {
                let mut pipe = Pipeline::new();
                for key in &keys {
                    pipe.del(key);
                }
                let counts: Vec<usize> = pipe.query_async(&mut *conn).await?;
                total_deleted += counts.iter().sum::<usize>();
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        debug!(pattern = %pattern, deleted = total_deleted, "Redis scan delete");
        Ok(total_deleted)
    }

    async fn pipeline_delete(&self, keys: &[&str]) -> CacheResult<Vec<usize>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.redis.lock().await;
        let mut pipe = Pipeline::new();
        for key in keys {
            pipe.del(*key);
        }

        let counts: Vec<usize> = pipe
            .query_async(&mut *conn)
            .await
            .map_err(CacheError::Redis)?;
        Ok(counts)
    }
}
