//! Process-local cache store.

use crate::error::CacheResult;
use crate::traits::CacheStore;
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }
}

/// In-memory cache backed by a concurrent map.
///
/// Expiry uses `tokio::time::Instant`, so paused-clock tests can advance
/// past a TTL deterministically. Expired entries are dropped lazily on
/// access, or in bulk with [`InMemoryCache::purge_expired`].
#[derive(Debug, Default)]
pub struct InMemoryCache {
    data: DashMap<String, CacheEntry>,
}

impl InMemoryCache {
    /// Create new in-memory cache
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
        }
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Remove every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.data.len();
        self.data.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.data.len())
    }

    /// Look up a live entry, evicting it if it has expired.
    fn live(&self, key: &str) -> Option<CacheEntry> {
        let now = Instant::now();
        let entry = self.data.get(key).map(|e| e.value().clone())?;

        if entry.is_expired(now) {
            // Ref is dropped before removal; remove_if avoids racing a fresh set.
            self.data.remove_if(key, |_, e| e.is_expired(now));
            tracing::trace!(key = %key, "Evicted expired cache entry");
            return None;
        }

        Some(entry)
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn get_json(&self, key: &str) -> CacheResult<Option<String>> {
        Ok(self.live(key).map(|entry| entry.value))
    }

    async fn set_json(&self, key: &str, value: String, ttl: Option<Duration>) -> CacheResult<()> {
        let expires_at = ttl.map(|d| Instant::now() + d);
        self.data
            .insert(key.to_string(), CacheEntry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.data.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        Ok(self.live(key).is_some())
    }

    async fn ttl(&self, key: &str) -> CacheResult<Option<Duration>> {
        Ok(self
            .live(key)
            .and_then(|entry| entry.expires_at)
            .map(|exp| exp.saturating_duration_since(Instant::now())))
    }

    async fn clear(&self) -> CacheResult<()> {
        self.data.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_at_ttl() {
        let cache = InMemoryCache::new();
        cache
            .set_json("k", "1".to_string(), Some(Duration::from_secs(10)))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(cache.get_json("k").await.unwrap(), Some("1".to_string()));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get_json("k").await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_does_not_refresh_ttl() {
        let cache = InMemoryCache::new();
        cache
            .set_json("k", "1".to_string(), Some(Duration::from_secs(10)))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(4)).await;
        cache.get_json("k").await.unwrap();

        assert_eq!(
            cache.ttl("k").await.unwrap(),
            Some(Duration::from_secs(6))
        );
    }

    #[tokio::test]
    async fn test_no_ttl_never_expires() {
        let cache = InMemoryCache::new();
        cache.set_json("k", "1".to_string(), None).await.unwrap();
        assert!(cache.exists("k").await.unwrap());
        assert_eq!(cache.ttl("k").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = InMemoryCache::new();
        cache
            .set_json("short", "1".to_string(), Some(Duration::from_secs(1)))
            .await
            .unwrap();
        cache.set_json("forever", "2".to_string(), None).await.unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let cache = InMemoryCache::new();
        cache.set_json("a", "1".to_string(), None).await.unwrap();
        cache.set_json("b", "2".to_string(), None).await.unwrap();

        cache.delete("a").await.unwrap();
        assert!(!cache.exists("a").await.unwrap());

        cache.clear().await.unwrap();
        assert!(cache.is_empty());
    }
}
