//! Key-value cache behaviour over the in-memory backend

use shelf_cache::{CacheKey, KeyValueCache, MemoryBackend};
use std::sync::Arc;
use std::time::Duration;

fn memory_cache() -> (KeyValueCache, Arc<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::new());
    (KeyValueCache::new(backend.clone()), backend)
}

#[tokio::test(start_paused = true)]
async fn test_value_expires_after_ttl_and_is_evicted() {
    let (cache, backend) = memory_cache();

    assert!(cache.set_with_expiry("profile:u1", "{\"name\":\"Ada\"}", 30).await);

    tokio::time::advance(Duration::from_secs(29)).await;
    assert_eq!(
        cache.get("profile:u1").await.as_deref(),
        Some("{\"name\":\"Ada\"}")
    );

    tokio::time::advance(Duration::from_secs(2)).await;
    assert_eq!(cache.get("profile:u1").await, None);
    assert!(!backend.contains_raw("profile:u1"));
}

#[tokio::test]
async fn test_delete_by_pattern_removes_only_matches() {
    let (cache, _backend) = memory_cache();

    cache.set_with_expiry("friends:u1:page:1", "[]", 60).await;
    cache.set_with_expiry("friends:u1:page:2", "[]", 60).await;
    cache.set_with_expiry("other:u2", "x", 60).await;

    assert_eq!(cache.delete_by_pattern("friends:u1*").await, 2);
    assert_eq!(cache.get("friends:u1:page:1").await, None);
    assert_eq!(cache.get("friends:u1:page:2").await, None);
    assert_eq!(cache.get("other:u2").await.as_deref(), Some("x"));
}

#[tokio::test]
async fn test_friends_pattern_spares_users_with_longer_ids() {
    let (cache, _backend) = memory_cache();

    cache.set_with_expiry(&CacheKey::friends_page("u1", 1), "[]", 60).await;
    cache.set_with_expiry(&CacheKey::friends_page("u12", 1), "[\"u3\"]", 60).await;

    assert_eq!(cache.delete_by_pattern(&CacheKey::friends_pattern("u1")).await, 1);
    assert_eq!(
        cache.get(&CacheKey::friends_page("u12", 1)).await.as_deref(),
        Some("[\"u3\"]")
    );
}

#[tokio::test]
async fn test_delete_by_pattern_without_matches() {
    let (cache, _backend) = memory_cache();
    cache.set_with_expiry("other:u2", "x", 60).await;

    assert_eq!(cache.delete_by_pattern("friends:*").await, 0);
    assert_eq!(cache.get("other:u2").await.as_deref(), Some("x"));
}

#[tokio::test]
async fn test_delete_reports_count() {
    let (cache, _backend) = memory_cache();
    cache.set_with_expiry(&CacheKey::profile("u1"), "x", 60).await;

    assert_eq!(cache.delete(&CacheKey::profile("u1")).await, 1);
    assert_eq!(cache.delete(&CacheKey::profile("u1")).await, 0);
}

#[tokio::test]
async fn test_pipeline_delete() {
    let (cache, backend) = memory_cache();
    let pending = CacheKey::pending_requests("u1");
    let sent = CacheKey::sent_requests("u1");
    cache.set_with_expiry(&pending, "[]", 60).await;
    cache.set_with_expiry(&sent, "[]", 60).await;

    assert_eq!(cache.pipeline_delete(&[&pending, &sent, "missing:key"]).await, 2);
    assert_eq!(backend.raw_len(), 0);
}
