use std::time::Duration;

use async_trait::async_trait;

use crate::application::ports::cache_backend::CacheBackend;

/// Stores nothing; every lookup is a miss.
pub struct NullCache;

#[async_trait]
impl CacheBackend for NullCache {
    fn kind(&self) -> &'static str {
        "null"
    }

    fn stores(&self) -> bool {
        false
    }

    async fn get(&self, _key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(None)
    }

    async fn set(
        &self,
        _key: &str,
        _value: Vec<u8>,
        _timeout: Option<Duration>,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> anyhow::Result<bool> {
        Ok(false)
    }

    async fn clear(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
