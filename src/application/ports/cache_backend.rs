use std::time::Duration;

use async_trait::async_trait;

/// Byte-oriented key/value store behind the application cache.
///
/// `timeout` of `None` keeps the entry until the backend evicts it.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    fn kind(&self) -> &'static str;

    /// `false` when `set` discards values, so lookups can never hit.
    fn stores(&self) -> bool {
        true
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;

    async fn set(&self, key: &str, value: Vec<u8>, timeout: Option<Duration>)
    -> anyhow::Result<()>;

    async fn delete(&self, key: &str) -> anyhow::Result<bool>;

    async fn clear(&self) -> anyhow::Result<()>;
}
