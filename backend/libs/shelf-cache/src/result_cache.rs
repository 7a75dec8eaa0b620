//! Memoization of async producers on top of [`KeyValueCache`].
//!
//! A hit returns the stored value without running the producer. A miss runs
//! the producer and stores its `Ok` value. Producer errors come back to the
//! caller untouched and are never cached. Concurrent misses for one key are
//! not coalesced: each runs the producer and the last write wins.

use crate::{ttl, KeyValueCache};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct ResultCache {
    cache: KeyValueCache,
    default_ttl_secs: u64,
}

impl ResultCache {
    pub fn new(cache: KeyValueCache) -> Self {
        Self::with_default_ttl(cache, ttl::DEFAULT)
    }

    pub fn with_default_ttl(cache: KeyValueCache, default_ttl_secs: u64) -> Self {
        Self {
            cache,
            default_ttl_secs,
        }
    }

    pub fn default_ttl_secs(&self) -> u64 {
        self.default_ttl_secs
    }

    pub fn store(&self) -> &KeyValueCache {
        &self.cache
    }

    /// Return the cached value for `key`, or run `producer` and cache its result.
    ///
    /// `ttl_secs` of `None` uses the default TTL.
    pub async fn get_or_fetch<T, E, F, Fut>(
        &self,
        key: &str,
        ttl_secs: Option<u64>,
        producer: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.cache.get_json::<T>(key).await {
            return Ok(cached);
        }

        let value = producer().await?;

        let ttl = ttl_secs.unwrap_or(self.default_ttl_secs);
        if !self.cache.set_json(key, &value, ttl).await {
            debug!(key = %key, "Result not cached, returning live value");
        }

        Ok(value)
    }

    /// Wrap `producer` so every call goes through the cache with the default TTL.
    pub fn wrap<K, P>(&self, key_fn: K, producer: P) -> CachedFn<K, P> {
        self.wrap_with_ttl(key_fn, producer, self.default_ttl_secs)
    }

    pub fn wrap_with_ttl<K, P>(&self, key_fn: K, producer: P, ttl_secs: u64) -> CachedFn<K, P> {
        CachedFn {
            cache: self.clone(),
            key_fn,
            producer,
            ttl_secs,
        }
    }
}

/// A producer bundled with its key function and TTL
pub struct CachedFn<K, P> {
    cache: ResultCache,
    key_fn: K,
    producer: P,
    ttl_secs: u64,
}

impl<K, P> CachedFn<K, P> {
    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    pub async fn call<A, T, E, Fut>(&self, args: A) -> Result<T, E>
    where
        K: Fn(&A) -> String,
        P: Fn(A) -> Fut,
        T: Serialize + DeserializeOwned,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = (self.key_fn)(&args);
        self.cache
            .get_or_fetch(&key, Some(self.ttl_secs), || (self.producer)(args))
            .await
    }
}
