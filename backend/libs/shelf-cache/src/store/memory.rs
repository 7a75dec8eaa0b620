//! In-process backend used when no Redis endpoint is configured and in tests.

use super::CacheBackend;
use crate::pattern::glob_match;
use crate::CacheResult;
use dashmap::DashMap;
use tokio::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(at) if now >= at)
    }
}

/// Map-backed store with lazy expiry.
///
/// Expired entries stay in the map until a read or a delete touches them.
/// A `ttl_secs` of zero stores the value without expiry.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: DashMap<String, MemoryEntry>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included
    pub fn raw_len(&self) -> usize {
        self.entries.len()
    }

    /// Whether an entry is physically present, ignoring expiry
    pub fn contains_raw(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

#[async_trait::async_trait]
impl CacheBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let now = Instant::now();
        let lookup = self
            .entries
            .get(key)
            .map(|entry| (!entry.is_expired(now)).then(|| entry.value.clone()));

        match lookup {
            None => Ok(None),
            Some(Some(value)) => Ok(Some(value)),
            Some(None) => {
                self.entries.remove_if(key, |_, entry| entry.is_expired(now));
                Ok(None)
            }
        }
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl_secs: u64) -> CacheResult<()> {
        let expires_at = (ttl_secs > 0).then(|| Instant::now() + Duration::from_secs(ttl_secs));
        self.entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<usize> {
        let now = Instant::now();
        Ok(match self.entries.remove(key) {
            Some((_, entry)) if !entry.is_expired(now) => 1,
            _ => 0,
        })
    }

    async fn delete_by_pattern(&self, pattern: &str) -> CacheResult<usize> {
        let now = Instant::now();
        let mut deleted = 0;
        // expired matches are dropped too but not counted
        self.entries.retain(|key, entry| {
            if !glob_match(pattern, key) {
                return true;
            }
            if !entry.is_expired(now) {
                deleted += 1;
            }
            false
        });
        Ok(deleted)
    }

    async fn pipeline_delete(&self, keys: &[&str]) -> CacheResult<Vec<usize>> {
        let mut counts = Vec::with_capacity(keys.len());
        for key in keys {
            counts.push(self.delete(key).await?);
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_lazy_expiry_evicts_on_read() {
        let backend = MemoryBackend::new();
        backend.set_with_expiry("session:u1", "token", 10).await.unwrap();

        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(backend.get("session:u1").await.unwrap().as_deref(), Some("token"));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(backend.contains_raw("session:u1"));
        assert_eq!(backend.get("session:u1").await.unwrap(), None);
        assert!(!backend.contains_raw("session:u1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ttl_never_expires() {
        let backend = MemoryBackend::new();
        backend.set_with_expiry("flag", "on", 0).await.unwrap();
        tokio::time::advance(Duration::from_secs(86_400)).await;
        assert_eq!(backend.get("flag").await.unwrap().as_deref(), Some("on"));
    }

    #[tokio::test]
    async fn test_overwrite_replaces_value() {
        let backend = MemoryBackend::new();
        backend.set_with_expiry("profile:u1", "v1", 60).await.unwrap();
        backend.set_with_expiry("profile:u1", "v2", 60).await.unwrap();
        assert_eq!(backend.get("profile:u1").await.unwrap().as_deref(), Some("v2"));
        assert_eq!(backend.raw_len(), 1);
    }

    #[tokio::test]
    async fn test_delete_counts() {
        let backend = MemoryBackend::new();
        backend.set_with_expiry("a:1", "x", 60).await.unwrap();
        assert_eq!(backend.delete("a:1").await.unwrap(), 1);
        assert_eq!(backend.delete("a:1").await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pattern_delete_skips_expired_in_count() {
        let backend = MemoryBackend::new();
        backend.set_with_expiry("feed:u1:1", "x", 5).await.unwrap();
        backend.set_with_expiry("feed:u1:2", "x", 60).await.unwrap();
        tokio::time::advance(Duration::from_secs(6)).await;

        assert_eq!(backend.delete_by_pattern("feed:u1:*").await.unwrap(), 1);
        assert_eq!(backend.raw_len(), 0);
    }
}
