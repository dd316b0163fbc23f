use std::sync::Arc;

use axum::{Router, middleware};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::application::ports::user_repository::UserRepository;
use crate::application::source_registry::{DatasourceCatalog, SourceRegistry};
use crate::bootstrap::app_builder::{self, AppBuilder};
use crate::bootstrap::app_context::{AppContext, AppServices};
use crate::bootstrap::config::{Config, DEFAULT_WELCOME_PATH, DOCS_PATH, OPENAPI_PATH};
use crate::bootstrap::uploads::ensure_upload_folder;
use crate::domain::datasource::DatasourceRef;
use crate::infrastructure::cache::build_cache;
use crate::infrastructure::datasources::builtin_catalog;
use crate::infrastructure::db::PgPool;
use crate::infrastructure::db::repositories::user_repository_sqlx::SqlxUserRepository;
use crate::infrastructure::security::SecurityManagerRegistry;
use crate::presentation::http::{
    auth, cors::build_cors, datasources, health, index, middleware::MiddlewareRegistry,
    proxy_fix::{ProxyFix, proxy_fix},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::presentation::http::index::index,
        crate::presentation::http::index::welcome,
        crate::bootstrap::app_builder::menu_view,
        crate::presentation::http::auth::login,
        crate::presentation::http::datasources::list_datasources,
        crate::presentation::http::datasources::get_datasource,
        crate::presentation::http::health::health,
    ),
    components(schemas(
        crate::presentation::http::index::WelcomeResp,
        crate::bootstrap::app_builder::MenuCategory,
        crate::bootstrap::app_builder::MenuResponse,
        crate::presentation::http::auth::LoginRequest,
        crate::presentation::http::auth::UserResponse,
        crate::presentation::http::datasources::DatasourceItem,
        crate::presentation::http::datasources::DatasourceListResponse,
        crate::presentation::http::health::HealthResp,
    )),
    tags(
        (name = "Index", description = "Landing pages and menu"),
        (name = "Auth", description = "Authentication"),
        (name = "Datasources", description = "Registered datasources"),
        (name = "Health", description = "System health checks")
    )
)]
pub struct ApiDoc;

/// OpenAPI document with the welcome view listed under its configured path.
pub fn api_doc(welcome_path: &str) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    if welcome_path != DEFAULT_WELCOME_PATH {
        if let Some(item) = doc.paths.paths.remove(DEFAULT_WELCOME_PATH) {
            doc.paths.paths.insert(welcome_path.to_owned(), item);
        }
    }
    doc
}

/// Named implementations that config entries refer to.
pub struct Extensions {
    pub middleware: MiddlewareRegistry,
    pub security_managers: SecurityManagerRegistry,
    pub datasources: DatasourceCatalog,
}

impl Extensions {
    pub fn builtin(pool: PgPool) -> Self {
        Self {
            middleware: MiddlewareRegistry::with_builtins(),
            security_managers: SecurityManagerRegistry::with_defaults(),
            datasources: builtin_catalog(pool),
        }
    }
}

/// Wires caches, security, datasources and HTTP layers onto `pool`.
///
/// Layers go on in a fixed order: CORS, then ProxyFix, then each entry of
/// `additional_middleware`, so the last configured middleware sees
/// requests first.
pub async fn build_app(
    cfg: Config,
    pool: PgPool,
    ext: Extensions,
) -> anyhow::Result<(AppContext, Router)> {
    cfg.validate()?;
    let cache = Arc::new(build_cache(&cfg.cache_config)?);
    let results_backend = match &cfg.results_backend {
        Some(rb) => Some(Arc::new(build_cache(rb)?)),
        None => None,
    };

    if let Some(folder) = &cfg.upload_folder {
        ensure_upload_folder(folder).await;
    }

    let users: Arc<dyn UserRepository> = Arc::new(SqlxUserRepository::new(pool.clone()));
    let security_manager = ext
        .security_managers
        .resolve(cfg.custom_security_manager.as_deref(), users)?;
    tracing::info!(security_manager = security_manager.name(), "security_manager_selected");

    let mut registry = SourceRegistry::new();
    registry.register_sources(&ext.datasources, &cfg.module_datasource_map())?;
    let sources = Arc::new(registry);

    let lookup_sources = sources.clone();
    let datasource_lookup = cache.cached_fn(
        None,
        |r: &DatasourceRef| format!("datasource/{}/{}", r.datasource_type, r.id),
        move |r: DatasourceRef| {
            let sources = lookup_sources.clone();
            async move { sources.get_datasource(&r.datasource_type, r.id).await }
        },
    );

    let services = AppServices::new(
        pool.clone(),
        cache,
        results_backend,
        security_manager,
        sources,
        datasource_lookup,
    );
    let ctx = AppContext::new(cfg.clone(), services);

    let mut admin = AppBuilder::new(ctx.clone());
    admin
        .add_view("Welcome", "Home", index::welcome_routes(ctx.clone()))
        .add_view("Datasources", "Sources", datasources::routes(ctx.clone()))
        .add_view("Login", "Security", auth::routes(ctx.clone()))
        .add_view("Health", "System", health::routes(ctx.clone()));

    let mut router = admin
        .into_router()
        .merge(SwaggerUi::new(DOCS_PATH).url(OPENAPI_PATH, api_doc(&cfg.welcome_path)));

    if cfg.enable_cors {
        router = router.layer(build_cors(&cfg.cors_options));
    }
    if cfg.enable_proxy_fix {
        let fix = ProxyFix::new(cfg.proxy_fix_num_proxies);
        router = router.layer(middleware::from_fn_with_state(fix, proxy_fix));
    }
    let router = ext.middleware.apply(router, &cfg.additional_middleware)?;

    tracing::info!(
        app = %cfg.app_name,
        menu_path = app_builder::MENU_PATH,
        welcome_path = %cfg.welcome_path,
        "app_built"
    );
    Ok((ctx, router))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::db::connect_lazy;
    use crate::bootstrap::config::ConfigError;
    use crate::presentation::http::middleware::MiddlewareError;
    use crate::application::source_registry::RegistryError;
    use axum::body::{Body, to_bytes};
    use http::{Request, StatusCode, header};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn test_config(temp: &TempDir) -> Config {
        Config {
            upload_folder: Some(temp.path().join("static").join("uploads")),
            ..Config::default()
        }
    }

    async fn build(cfg: Config) -> anyhow::Result<(AppContext, Router)> {
        let pool = connect_lazy(&cfg)?;
        let ext = Extensions::builtin(pool.clone());
        build_app(cfg, pool, ext).await
    }

    #[tokio::test]
    async fn index_redirects_to_welcome() {
        let temp = TempDir::new().unwrap();
        let (_, app) = build(test_config(&temp)).await.unwrap();
        let res = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers()[header::LOCATION], "/vista/welcome");
    }

    #[tokio::test]
    async fn welcome_lists_registered_types_and_menu() {
        let temp = TempDir::new().unwrap();
        let (ctx, app) = build(test_config(&temp)).await.unwrap();
        assert_eq!(ctx.sources().types(), vec!["druid", "table"]);

        let res = app
            .clone()
            .oneshot(Request::get("/vista/welcome").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: serde_json::Value =
            serde_json::from_slice(&to_bytes(res.into_body(), 4096).await.unwrap()).unwrap();
        assert_eq!(body["datasource_types"], serde_json::json!(["druid", "table"]));

        let res = app
            .oneshot(Request::get("/vista/menu").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body: serde_json::Value =
            serde_json::from_slice(&to_bytes(res.into_body(), 4096).await.unwrap()).unwrap();
        assert_eq!(body["security_manager"], "db");
        assert_eq!(body["menu"][0]["category"], "Home");
        assert_eq!(body["menu"][1]["views"], serde_json::json!(["Datasources"]));
    }

    #[tokio::test]
    async fn custom_welcome_path_is_followed() {
        let temp = TempDir::new().unwrap();
        let cfg = Config {
            welcome_path: "/home".into(),
            ..test_config(&temp)
        };
        let (_, app) = build(cfg).await.unwrap();
        let res = app
            .clone()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.headers()[header::LOCATION], "/home");
        let res = app
            .oneshot(Request::get("/home").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[test]
    fn api_doc_follows_welcome_path() {
        let default = api_doc(DEFAULT_WELCOME_PATH);
        assert!(default.paths.paths.contains_key("/vista/welcome"));

        let moved = api_doc("/home");
        assert!(moved.paths.paths.contains_key("/home"));
        assert!(!moved.paths.paths.contains_key("/vista/welcome"));
        assert!(moved.paths.paths.contains_key("/health"));
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let temp = TempDir::new().unwrap();
        let cfg = Config {
            welcome_path: "/home".into(),
            ..test_config(&temp)
        };
        let (_, app) = build(cfg).await.unwrap();
        let res = app
            .oneshot(Request::get(OPENAPI_PATH).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: serde_json::Value =
            serde_json::from_slice(&to_bytes(res.into_body(), 1 << 20).await.unwrap()).unwrap();
        assert!(body["paths"].get("/home").is_some());
        assert!(body["paths"].get("/vista/welcome").is_none());
    }

    #[tokio::test]
    async fn cors_and_middleware_are_layered_when_enabled() {
        let temp = TempDir::new().unwrap();
        let cfg = Config {
            enable_cors: true,
            enable_proxy_fix: true,
            additional_middleware: vec!["server_header".into()],
            ..test_config(&temp)
        };
        let (_, app) = build(cfg).await.unwrap();
        let res = app
            .oneshot(
                Request::get("/vista/welcome")
                    .header(header::ORIGIN, "https://bi.example.com")
                    .header("x-forwarded-for", "203.0.113.9")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(res.headers().contains_key(header::SERVER));
    }

    #[tokio::test]
    async fn cors_is_off_by_default() {
        let temp = TempDir::new().unwrap();
        let (_, app) = build(test_config(&temp)).await.unwrap();
        let res = app
            .oneshot(
                Request::get("/vista/welcome")
                    .header(header::ORIGIN, "https://bi.example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[tokio::test]
    async fn creates_upload_folder() {
        let temp = TempDir::new().unwrap();
        let cfg = test_config(&temp);
        let folder = cfg.upload_folder.clone().unwrap();
        build(cfg).await.unwrap();
        assert!(folder.is_dir());
    }

    #[tokio::test]
    async fn unknown_middleware_aborts() {
        let temp = TempDir::new().unwrap();
        let cfg = Config {
            additional_middleware: vec!["gzip".into()],
            ..test_config(&temp)
        };
        let err = build(cfg).await.err().unwrap();
        assert_eq!(
            err.downcast_ref::<MiddlewareError>(),
            Some(&MiddlewareError::Unknown("gzip".into()))
        );
    }

    #[tokio::test]
    async fn unknown_datasource_module_aborts() {
        let temp = TempDir::new().unwrap();
        let mut cfg = test_config(&temp);
        cfg.additional_module_ds_map
            .insert("contrib.sources".into(), vec!["Elastic".into()]);
        let err = build(cfg).await.err().unwrap();
        assert!(matches!(
            err.downcast_ref::<RegistryError>(),
            Some(RegistryError::UnknownModule(m)) if m == "contrib.sources"
        ));
    }

    #[tokio::test]
    async fn reserved_welcome_path_is_a_config_error() {
        for path in ["/", "/health", "/vista/menu"] {
            let temp = TempDir::new().unwrap();
            let cfg = Config {
                welcome_path: path.into(),
                ..test_config(&temp)
            };
            let err = build(cfg).await.err().unwrap();
            assert!(matches!(
                err.downcast_ref::<ConfigError>(),
                Some(ConfigError::InvalidValue { key: "welcome_path", .. })
            ));
        }
    }

    #[tokio::test]
    async fn unknown_security_manager_aborts() {
        let temp = TempDir::new().unwrap();
        let cfg = Config {
            custom_security_manager: Some("ldap".into()),
            ..test_config(&temp)
        };
        assert!(build(cfg).await.is_err());
    }
}
