use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};

use crate::bootstrap::config::Config;

pub type PgPool = Pool<Postgres>;

fn pool_options(cfg: &Config) -> PgPoolOptions {
    // Ping each connection on checkout so stale ones are replaced
    // instead of surfacing as query errors.
    PgPoolOptions::new()
        .max_connections(cfg.db_max_connections)
        .test_before_acquire(true)
        .acquire_timeout(Duration::from_secs(10))
}

pub async fn connect_pool(cfg: &Config) -> anyhow::Result<PgPool> {
    let pool = pool_options(cfg).connect(&cfg.database_url).await?;
    Ok(pool)
}

/// Pool that connects on first use.
pub fn connect_lazy(cfg: &Config) -> anyhow::Result<PgPool> {
    Ok(pool_options(cfg).connect_lazy(&cfg.database_url)?)
}

pub async fn migrate(pool: &PgPool) -> anyhow::Result<()> {
    // Uses compile-time embedded migrations under ./migrations
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub mod repositories;
