//! Redis backend tests
//!
//! These tests require a running Redis instance.
//! Run with: cargo test --test redis_backend_test -- --ignored

use shelf_cache::{CacheConfig, CacheProvider, KeyValueCache, RedisBackend};
use std::sync::Arc;
use std::time::Duration;

const REDIS_URL: &str = "redis://127.0.0.1:6379";

async fn redis_cache() -> KeyValueCache {
    let backend = RedisBackend::connect(REDIS_URL)
        .await
        .expect("Failed to connect to Redis");
    KeyValueCache::new(Arc::new(backend))
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_set_get_and_expire() {
    let cache = redis_cache().await;

    assert!(cache.set_with_expiry("it:expire:u1", "value", 1).await);
    assert_eq!(cache.get("it:expire:u1").await.as_deref(), Some("value"));

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(cache.get("it:expire:u1").await, None);
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_scan_delete_by_pattern() {
    let cache = redis_cache().await;

    cache.set_with_expiry("itfriends:u1:page:1", "[]", 60).await;
    cache.set_with_expiry("itfriends:u1:page:2", "[]", 60).await;
    cache.set_with_expiry("itother:u2", "x", 60).await;

    assert_eq!(cache.delete_by_pattern("itfriends:u1*").await, 2);
    assert_eq!(cache.get("itother:u2").await.as_deref(), Some("x"));
    assert_eq!(cache.delete("itother:u2").await, 1);
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_pattern_special_characters_are_literal() {
    let cache = redis_cache().await;

    cache.set_with_expiry("itliteral:u1", "a", 60).await;
    cache.set_with_expiry("itliteral:u?", "b", 60).await;
    cache.set_with_expiry("itliteral:[x]", "c", 60).await;

    assert_eq!(cache.delete_by_pattern("itliteral:u?").await, 1);
    assert_eq!(cache.get("itliteral:u1").await.as_deref(), Some("a"));
    assert_eq!(cache.delete_by_pattern("itliteral:[x]*").await, 1);
    assert_eq!(cache.delete("itliteral:u1").await, 1);
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_pipeline_delete() {
    let cache = redis_cache().await;

    cache.set_with_expiry("itpipe:1", "a", 60).await;
    cache.set_with_expiry("itpipe:2", "b", 60).await;

    assert_eq!(cache.pipeline_delete(&["itpipe:1", "itpipe:2", "itpipe:3"]).await, 2);
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_provider_selects_redis() {
    let provider = CacheProvider::new(CacheConfig {
        redis_url: Some(REDIS_URL.to_string()),
        ..CacheConfig::default()
    });

    assert_eq!(provider.client().await.backend_name(), "redis");
    assert!(provider.teardown().await);
}

#[tokio::test]
#[ignore] // Slow: the connection manager retries the initial connect with backoff
async fn test_provider_falls_back_when_redis_unreachable() {
    let provider = CacheProvider::new(CacheConfig {
        // nothing listens on the discard port
        redis_url: Some("redis://127.0.0.1:9".to_string()),
        ..CacheConfig::default()
    });

    let client = provider.client().await;
    assert_eq!(client.backend_name(), "memory");
}
