use std::sync::Arc;

use crate::application::ports::security_manager::SecurityManager;
use crate::application::services::cache::{Cache, CachedFn};
use crate::application::source_registry::SourceRegistry;
use crate::bootstrap::config::Config;
use crate::domain::datasource::{DatasourceRecord, DatasourceRef};
use crate::infrastructure::db::PgPool;

pub type DatasourceLookup = CachedFn<DatasourceRef, Option<DatasourceRecord>>;

/// Process-wide services, built once at startup and shared by handlers.
#[derive(Clone)]
pub struct AppContext {
    pub cfg: Config,
    services: Arc<AppServices>,
}

pub struct AppServices {
    pool: PgPool,
    cache: Arc<Cache>,
    results_backend: Option<Arc<Cache>>,
    security_manager: Arc<dyn SecurityManager>,
    sources: Arc<SourceRegistry>,
    datasource_lookup: DatasourceLookup,
}

impl AppServices {
    pub fn new(
        pool: PgPool,
        cache: Arc<Cache>,
        results_backend: Option<Arc<Cache>>,
        security_manager: Arc<dyn SecurityManager>,
        sources: Arc<SourceRegistry>,
        datasource_lookup: DatasourceLookup,
    ) -> Self {
        Self {
            pool,
            cache,
            results_backend,
            security_manager,
            sources,
            datasource_lookup,
        }
    }
}

impl AppContext {
    pub fn new(cfg: Config, services: AppServices) -> Self {
        Self {
            cfg,
            services: Arc::new(services),
        }
    }

    pub fn pool(&self) -> PgPool {
        self.services.pool.clone()
    }

    pub fn cache(&self) -> Arc<Cache> {
        self.services.cache.clone()
    }

    pub fn results_backend(&self) -> Option<Arc<Cache>> {
        self.services.results_backend.clone()
    }

    pub fn security_manager(&self) -> Arc<dyn SecurityManager> {
        self.services.security_manager.clone()
    }

    pub fn sources(&self) -> Arc<SourceRegistry> {
        self.services.sources.clone()
    }

    /// Single datasource lookup, memoized in the application cache.
    pub async fn datasource(
        &self,
        datasource_type: &str,
        id: i64,
    ) -> anyhow::Result<Option<DatasourceRecord>> {
        self.services
            .datasource_lookup
            .call(DatasourceRef {
                datasource_type: datasource_type.to_owned(),
                id,
            })
            .await
    }
}
