use std::time::Duration;

use http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer, ExposeHeaders};

use crate::bootstrap::config::CorsOptions;

/// Builds the CORS layer from `cors_options`.
///
/// A `*` entry allows anything; with credentials enabled the request's
/// own origin/method/headers are mirrored instead, since browsers reject
/// a wildcard on credentialed responses.
pub fn build_cors(opts: &CorsOptions) -> CorsLayer {
    let credentials = opts.supports_credentials;
    let wildcard = |items: &[String]| items.iter().any(|i| i.trim() == "*");

    let origin = if wildcard(&opts.origins) {
        if credentials {
            AllowOrigin::mirror_request()
        } else {
            AllowOrigin::from(Any)
        }
    } else {
        let origins: Vec<HeaderValue> = opts
            .origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o.trim()) {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!(origin = %o, "cors_origin_invalid_skipped");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    let methods = if wildcard(&opts.methods) {
        if credentials {
            AllowMethods::mirror_request()
        } else {
            AllowMethods::from(Any)
        }
    } else {
        let methods: Vec<Method> = opts
            .methods
            .iter()
            .filter_map(|m| match Method::from_bytes(m.trim().to_ascii_uppercase().as_bytes()) {
                Ok(method) => Some(method),
                Err(_) => {
                    tracing::warn!(method = %m, "cors_method_invalid_skipped");
                    None
                }
            })
            .collect();
        AllowMethods::list(methods)
    };

    let headers = if wildcard(&opts.allow_headers) {
        if credentials {
            AllowHeaders::mirror_request()
        } else {
            AllowHeaders::from(Any)
        }
    } else {
        AllowHeaders::list(header_names("allow_headers", &opts.allow_headers))
    };

    let expose = ExposeHeaders::list(header_names("expose_headers", &opts.expose_headers));

    let mut layer = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(methods)
        .allow_headers(headers)
        .expose_headers(expose)
        .allow_credentials(credentials);
    if let Some(secs) = opts.max_age {
        layer = layer.max_age(Duration::from_secs(secs));
    }
    layer
}

fn header_names(field: &'static str, names: &[String]) -> Vec<HeaderName> {
    names
        .iter()
        .filter(|n| n.trim() != "*")
        .filter_map(|n| match HeaderName::from_bytes(n.trim().as_bytes()) {
            Ok(name) => Some(name),
            Err(_) => {
                tracing::warn!(field, header = %n, "cors_header_invalid_skipped");
                None
            }
        })
        .collect()
}
