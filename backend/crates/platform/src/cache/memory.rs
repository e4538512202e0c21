//! In-Memory Counter Cache
//!
//! Single-process stand-in for Redis. Counters are not shared between
//! instances, so only use it for one replica or for tests.

use super::{CacheError, CacheResult, CounterCache};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Expired entries are swept once the map grows past this many keys.
const SWEEP_THRESHOLD: usize = 4096;

#[derive(Debug, Clone, Copy)]
struct Entry {
    value: i64,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|deadline| deadline > now)
    }
}

/// Drop expired entries once the map is large. Called before every insert.
fn sweep_if_full(entries: &mut HashMap<String, Entry>, now: Instant) {
    if entries.len() >= SWEEP_THRESHOLD {
        entries.retain(|_, entry| entry.is_live(now));
    }
}

#[derive(Clone, Default)]
pub struct InMemoryCounterCache {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl InMemoryCounterCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored, including expired ones not yet swept.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn live_entry(&self, key: &str) -> Option<Entry> {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .get(key)
            .copied()
            .filter(|entry| entry.is_live(now))
    }
}

impl CounterCache for InMemoryCounterCache {
    async fn exists(&self, key: &str) -> CacheResult<bool> {
        Ok(self.live_entry(key).await.is_some())
    }

    async fn get_integer(&self, key: &str) -> CacheResult<Option<i64>> {
        Ok(self.live_entry(key).await.map(|entry| entry.value))
    }

    async fn set_integer(&self, key: &str, value: i64, ttl: Duration) -> CacheResult<()> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        sweep_if_full(&mut entries, now);

        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Some(now + ttl),
            },
        );
        Ok(())
    }

    async fn increment(&self, key: &str) -> CacheResult<i64> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        if !entries.contains_key(key) {
            sweep_if_full(&mut entries, now);
        }

        let entry = entries
            .entry(key.to_string())
            .and_modify(|entry| {
                if !entry.is_live(now) {
                    *entry = Entry {
                        value: 0,
                        expires_at: None,
                    };
                }
            })
            .or_insert(Entry {
                value: 0,
                expires_at: None,
            });

        entry.value = entry
            .value
            .checked_add(1)
            .ok_or_else(|| CacheError::InvalidValue {
                key: key.to_string(),
            })?;
        Ok(entry.value)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<bool> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        match entries.get_mut(key) {
            Some(entry) if entry.is_live(now) => {
                entry.expires_at = Some(now + ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[tokio::test(start_paused = true)]
    async fn test_set_and_get_until_expiry() {
        let cache = InMemoryCounterCache::new();
        assert_ok!(cache.set_integer("rate:a", 1, Duration::from_secs(10)).await);

        assert!(cache.exists("rate:a").await.unwrap());
        assert_eq!(cache.get_integer("rate:a").await.unwrap(), Some(1));

        tokio::time::advance(Duration::from_secs(10)).await;

        assert!(!cache.exists("rate:a").await.unwrap());
        assert_eq!(cache.get_integer("rate:a").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_increment_keeps_ttl() {
        let cache = InMemoryCounterCache::new();
        cache
            .set_integer("rate:b", 1, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(cache.increment("rate:b").await.unwrap(), 2);
        assert_eq!(cache.increment("rate:b").await.unwrap(), 3);

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(!cache.exists("rate:b").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_increment_missing_key_starts_at_one_without_ttl() {
        let cache = InMemoryCounterCache::new();
        assert_eq!(cache.increment("rate:c").await.unwrap(), 1);

        tokio::time::advance(Duration::from_secs(3600)).await;
        assert_eq!(cache.get_integer("rate:c").await.unwrap(), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expire() {
        let cache = InMemoryCounterCache::new();
        assert!(!cache.expire("rate:d", Duration::from_secs(1)).await.unwrap());

        cache.increment("rate:d").await.unwrap();
        assert!(cache.expire("rate:d", Duration::from_secs(1)).await.unwrap());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(!cache.exists("rate:d").await.unwrap());
    }

    #[tokio::test]
    async fn test_increment_overflow_is_an_error() {
        let cache = InMemoryCounterCache::new();
        cache
            .set_integer("rate:e", i64::MAX, Duration::from_secs(60))
            .await
            .unwrap();

        let result = cache.increment("rate:e").await;
        assert!(matches!(result, Err(CacheError::InvalidValue { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_increment_sweeps_expired_counters() {
        let cache = InMemoryCounterCache::new();
        assert!(cache.is_empty().await);

        // Counters created the way the atomic limiter does: INCR then EXPIRE.
        for n in 0..5000 {
            let key = format!("rate:old-{n}");
            cache.increment(&key).await.unwrap();
            cache.expire(&key, Duration::from_secs(180)).await.unwrap();
        }
        assert_eq!(cache.len().await, 5000);

        tokio::time::advance(Duration::from_secs(3600)).await;

        for n in 0..5000 {
            let key = format!("rate:new-{n}");
            cache.increment(&key).await.unwrap();
            cache.expire(&key, Duration::from_secs(180)).await.unwrap();
        }
        assert_eq!(cache.len().await, 5000);
        assert!(!cache.exists("rate:old-0").await.unwrap());
        assert!(cache.exists("rate:new-4999").await.unwrap());
    }
}
