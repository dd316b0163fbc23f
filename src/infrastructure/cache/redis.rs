use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tokio::sync::OnceCell;

use crate::application::ports::cache_backend::CacheBackend;

/// Redis-backed cache. The connection is opened on first use.
pub struct RedisCache {
    client: redis::Client,
    conn: OnceCell<ConnectionManager>,
    key_prefix: String,
}

impl RedisCache {
    pub fn new(url: &str, key_prefix: impl Into<String>) -> anyhow::Result<Self> {
        let client = redis::Client::open(url).context("redis_client_open")?;
        Ok(Self {
            client,
            conn: OnceCell::new(),
            key_prefix: key_prefix.into(),
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    async fn connection(&self) -> anyhow::Result<ConnectionManager> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                ConnectionManager::new(self.client.clone())
                    .await
                    .context("redis_connection_manager")
            })
            .await?;
        Ok(conn.clone())
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    fn kind(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let mut conn = self.connection().await?;
        let value: Option<Vec<u8>> = conn.get(self.key(key)).await.context("redis_get")?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, timeout: Option<Duration>) -> anyhow::Result<()> {
        let mut conn = self.connection().await?;
        let key = self.key(key);
        match timeout {
            Some(ttl) => {
                let secs = ttl.as_secs().max(1);
                let _: () = conn.set_ex(key, value, secs).await.context("redis_set_ex")?;
            }
            None => {
                let _: () = conn.set(key, value).await.context("redis_set")?;
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<bool> {
        let mut conn = self.connection().await?;
        let removed: i64 = conn.del(self.key(key)).await.context("redis_del")?;
        Ok(removed > 0)
    }

    async fn clear(&self) -> anyhow::Result<()> {
        let mut conn = self.connection().await?;
        if self.key_prefix.is_empty() {
            let _: () = redis::cmd("FLUSHDB")
                .query_async(&mut conn)
                .await
                .context("redis_flushdb")?;
            return Ok(());
        }
        let pattern = format!("{}*", self.key_prefix);
        let keys: Vec<String> = {
            let mut iter = conn
                .scan_match::<_, String>(&pattern)
                .await
                .context("redis_scan")?;
            let mut keys = Vec::new();
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
            keys
        };
        if !keys.is_empty() {
            let _: i64 = conn.del(keys).await.context("redis_del_prefixed")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_keys() {
        let cache = RedisCache::new("redis://127.0.0.1:6379/0", "vista_").unwrap();
        assert_eq!(cache.key("view/a"), "vista_view/a");
    }

    #[test]
    fn rejects_malformed_url() {
        assert!(RedisCache::new("not a url", "").is_err());
    }
}
