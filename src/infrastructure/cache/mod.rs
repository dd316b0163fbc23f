use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::application::ports::cache_backend::CacheBackend;
use crate::application::services::cache::Cache;
use crate::bootstrap::config::{CacheConfig, CacheType};

pub mod null;
pub mod redis;
pub mod simple;

pub fn build_backend(cfg: &CacheConfig) -> anyhow::Result<Arc<dyn CacheBackend>> {
    let backend: Arc<dyn CacheBackend> = match cfg.cache_type {
        CacheType::Null => Arc::new(null::NullCache),
        CacheType::Simple => Arc::new(simple::SimpleCache::new(cfg.max_entries)),
        CacheType::Redis => {
            let url = cfg
                .redis_url
                .as_deref()
                .context("cache_config.redis_url is required for the redis cache")?;
            Arc::new(redis::RedisCache::new(url, cfg.key_prefix.clone())?)
        }
    };
    Ok(backend)
}

pub fn build_cache(cfg: &CacheConfig) -> anyhow::Result<Cache> {
    let backend = build_backend(cfg)?;
    tracing::info!(
        backend = backend.kind(),
        default_timeout_secs = cfg.default_timeout,
        "cache_configured"
    );
    Ok(Cache::new(
        backend,
        Duration::from_secs(cfg.default_timeout),
    ))
}
