use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Router;
use axum::extract::MatchedPath;
use http::{HeaderValue, header};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

pub type MiddlewareFactory = Arc<dyn Fn(Router) -> Router + Send + Sync>;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum MiddlewareError {
    #[error("unknown middleware `{0}`")]
    Unknown(String),
}

/// Named router wrappers that `additional_middleware` can refer to.
#[derive(Clone, Default)]
pub struct MiddlewareRegistry {
    factories: BTreeMap<String, MiddlewareFactory>,
}

impl MiddlewareRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::default();
        registry
            .register("request_id", |router| {
                router
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            })
            .register("trace", |router| {
                router.layer(TraceLayer::new_for_http().make_span_with(
                    |req: &http::Request<_>| {
                        let method = req.method().clone();
                        let uri = req.uri().clone();
                        let matched = req
                            .extensions()
                            .get::<MatchedPath>()
                            .map(|p| p.as_str().to_string())
                            .unwrap_or_default();
                        tracing::info_span!("http", %method, %uri, matched_path = %matched)
                    },
                ))
            })
            .register("no_store", |router| {
                router.layer(SetResponseHeaderLayer::if_not_present(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("no-store"),
                ))
            })
            .register("server_header", |router| {
                router.layer(SetResponseHeaderLayer::overriding(
                    header::SERVER,
                    HeaderValue::from_static(concat!("vista/", env!("CARGO_PKG_VERSION"))),
                ))
            });
        registry
    }

    pub fn register<F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        F: Fn(Router) -> Router + Send + Sync + 'static,
    {
        self.factories.insert(name.to_owned(), Arc::new(factory));
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Wraps `router` with each named middleware in order, so the last
    /// name ends up outermost. Fails before wrapping if any name is unknown.
    pub fn apply(&self, mut router: Router, names: &[String]) -> Result<Router, MiddlewareError> {
        let factories = names
            .iter()
            .map(|name| {
                self.factories
                    .get(name)
                    .cloned()
                    .ok_or_else(|| MiddlewareError::Unknown(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        for (name, factory) in names.iter().zip(factories) {
            router = factory(router);
            tracing::debug!(middleware = %name, "middleware_applied");
        }
        Ok(router)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, routing::get};
    use http::{HeaderName, Request, StatusCode};
    use tower::ServiceExt;

    const X_ORDER: HeaderName = HeaderName::from_static("x-order");

    fn registry() -> MiddlewareRegistry {
        let mut registry = MiddlewareRegistry::with_builtins();
        for tag in ["first", "second"] {
            registry.register(tag, move |router| {
                router.layer(SetResponseHeaderLayer::appending(
                    X_ORDER,
                    HeaderValue::from_static(tag),
                ))
            });
        }
        registry
    }

    fn base() -> Router {
        Router::new().route("/", get(|| async { "ok" }))
    }

    #[tokio::test]
    async fn applies_in_list_order_last_outermost() {
        let names = vec!["first".to_string(), "second".to_string()];
        let app = registry().apply(base(), &names).unwrap();
        let res = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let order: Vec<_> = res
            .headers()
            .get_all(X_ORDER)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(order, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn builtins_set_headers() {
        let names = vec![
            "request_id".to_string(),
            "no_store".to_string(),
            "server_header".to_string(),
            "trace".to_string(),
        ];
        let app = registry().apply(base(), &names).unwrap();
        let res = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(res.headers().contains_key("x-request-id"));
        assert_eq!(res.headers()[header::CACHE_CONTROL], "no-store");
        assert!(
            res.headers()[header::SERVER]
                .to_str()
                .unwrap()
                .starts_with("vista/")
        );
    }

    #[test]
    fn unknown_name_is_rejected() {
        let names = vec!["request_id".to_string(), "gzip".to_string()];
        let err = registry().apply(base(), &names).err().unwrap();
        assert_eq!(err, MiddlewareError::Unknown("gzip".into()));
        assert!(registry().names().contains(&"trace"));
    }
}
