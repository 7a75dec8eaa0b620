//! Environment-driven cache configuration.
//!
//! The backend is chosen by a single switch: when `REDIS_URL` is set the cache
//! talks to Redis, otherwise it keeps everything in process.

use crate::{ttl, CacheError, CacheResult};
use std::env;
use std::str::FromStr;

/// Which store a [`crate::KeyValueCache`] is built on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendKind {
    Memory,
    Redis { url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Redis endpoint; `None` selects the in-memory store
    pub redis_url: Option<String>,
    /// TTL for result cache entries without an explicit TTL
    pub default_ttl_secs: u64,
    /// TTL for pair cache entries
    pub pair_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            default_ttl_secs: ttl::DEFAULT,
            pair_ttl_secs: ttl::PAIR,
        }
    }
}

impl CacheConfig {
    /// Load from the environment, reading `.env` first when present
    pub fn from_env() -> CacheResult<Self> {
        dotenv::dotenv().ok();

        let redis_url = env::var("REDIS_URL")
            .ok()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        Ok(Self {
            redis_url,
            default_ttl_secs: parse_env_or("CACHE_DEFAULT_TTL_SECS", ttl::DEFAULT)?,
            pair_ttl_secs: parse_env_or("PAIR_CACHE_TTL_SECS", ttl::PAIR)?,
        })
    }

    pub fn backend_kind(&self) -> BackendKind {
        match &self.redis_url {
            Some(url) => BackendKind::Redis { url: url.clone() },
            None => BackendKind::Memory,
        }
    }

    pub fn pair_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.pair_ttl_secs)
    }
}

fn parse_env_or<T: FromStr>(key: &str, default: T) -> CacheResult<T> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| CacheError::Configuration(format!("{} has invalid value {:?}", key, raw))),
        Err(_) => Ok(default),
    }
}
