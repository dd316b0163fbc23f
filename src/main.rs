use std::net::SocketAddr;

use dotenvy::dotenv;
use tracing::{error, info};

use vista::bootstrap::app::{Extensions, build_app};
use vista::bootstrap::config::Config;
use vista::bootstrap::logging::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let cfg = Config::load()?;
    let _log_guard = init_logging(&cfg)?;
    info!(app = %cfg.app_name, port = cfg.api_port, debug = cfg.debug, "Starting Vista");

    // Database
    let pool = vista::infrastructure::db::connect_pool(&cfg).await?;
    vista::infrastructure::db::migrate(&pool).await?;

    let ext = Extensions::builtin(pool.clone());
    let (ctx, app) = build_app(cfg.clone(), pool, ext).await?;
    if let Err(e) = ctx.security_manager().sync_roles().await {
        error!(?e, "sync_roles_failed");
    }

    let api_addr = SocketAddr::from(([0, 0, 0, 0], cfg.api_port));
    info!(%api_addr, "HTTP API listening");
    let listener = tokio::net::TcpListener::bind(api_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    info!("HTTP API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(?e, "shutdown_signal_failed");
    }
}
