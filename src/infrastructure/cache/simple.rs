use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache as MokaCache;

use crate::application::ports::cache_backend::CacheBackend;

#[derive(Clone)]
struct Entry {
    value: Arc<Vec<u8>>,
    ttl: Option<Duration>,
}

struct EntryExpiry;

impl Expiry<String, Entry> for EntryExpiry {
    fn expire_after_create(&self, _key: &String, value: &Entry, _created_at: Instant) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

/// In-process cache with per-entry expiry, bounded by entry count.
pub struct SimpleCache {
    inner: MokaCache<String, Entry>,
}

impl SimpleCache {
    pub fn new(max_entries: u64) -> Self {
        let inner = MokaCache::builder()
            .max_capacity(max_entries)
            .expire_after(EntryExpiry)
            .build();
        Self { inner }
    }
}

#[async_trait]
impl CacheBackend for SimpleCache {
    fn kind(&self) -> &'static str {
        "simple"
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.inner.get(key).await.map(|e| e.value.as_ref().clone()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, timeout: Option<Duration>) -> anyhow::Result<()> {
        self.inner
            .insert(
                key.to_owned(),
                Entry {
                    value: Arc::new(value),
                    ttl: timeout,
                },
            )
            .await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<bool> {
        Ok(self.inner.remove(key).await.is_some())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        self.inner.invalidate_all();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stores_and_expires_entries() {
        let cache = SimpleCache::new(10);
        cache
            .set("a", b"1".to_vec(), Some(Duration::from_millis(20)))
            .await
            .unwrap();
        cache.set("b", b"2".to_vec(), None).await.unwrap();
        assert_eq!(cache.get("a").await.unwrap(), Some(b"1".to_vec()));
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(cache.get("a").await.unwrap(), None);
        assert_eq!(cache.get("b").await.unwrap(), Some(b"2".to_vec()));
    }

    #[tokio::test]
    async fn delete_and_clear() {
        let cache = SimpleCache::new(10);
        cache.set("a", b"1".to_vec(), None).await.unwrap();
        assert!(cache.delete("a").await.unwrap());
        assert!(!cache.delete("a").await.unwrap());
        cache.set("b", b"2".to_vec(), None).await.unwrap();
        cache.clear().await.unwrap();
        assert_eq!(cache.get("b").await.unwrap(), None);
    }
}
