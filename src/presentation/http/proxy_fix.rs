use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use http::{HeaderMap, HeaderValue, header};

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// Client-facing request details recovered from reverse-proxy headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardedInfo {
    pub client_addr: Option<String>,
    pub scheme: String,
    pub host: Option<String>,
    pub original_addr: Option<String>,
    pub original_host: Option<String>,
}

/// Trusts `X-Forwarded-*` headers set by `num_proxies` reverse proxies.
#[derive(Debug, Clone, Copy)]
pub struct ProxyFix {
    pub num_proxies: usize,
}

impl ProxyFix {
    pub fn new(num_proxies: usize) -> Self {
        Self {
            num_proxies: num_proxies.max(1),
        }
    }

    pub fn resolve(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> ForwardedInfo {
        let original_addr = peer.map(|p| p.ip().to_string());
        let original_host = header_str(headers, header::HOST.as_str()).map(str::to_owned);

        let forwarded_for: Vec<&str> = headers
            .get_all(X_FORWARDED_FOR)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect();
        // n-th address from the right is the one our nearest trusted proxy saw.
        let client_addr = if forwarded_for.len() >= self.num_proxies {
            Some(forwarded_for[forwarded_for.len() - self.num_proxies].to_owned())
        } else {
            original_addr.clone()
        };

        let scheme = header_str(headers, X_FORWARDED_PROTO)
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_ascii_lowercase())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "http".to_string());

        let host = header_str(headers, X_FORWARDED_HOST)
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
            .or_else(|| original_host.clone());

        ForwardedInfo {
            client_addr,
            scheme,
            host,
            original_addr,
            original_host,
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

pub async fn proxy_fix(State(fix): State<ProxyFix>, mut req: Request, next: Next) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let info = fix.resolve(req.headers(), peer);
    if let Some(host) = info.host.as_deref() {
        if info.original_host.as_deref() != Some(host) {
            if let Ok(value) = HeaderValue::from_str(host) {
                req.headers_mut().insert(header::HOST, value);
            }
        }
    }
    req.extensions_mut().insert(info);
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Extension, Router, body::Body, middleware, routing::get};
    use http::Request as HttpRequest;
    use tower::ServiceExt;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.append(*k, HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn picks_address_by_proxy_count() {
        let h = headers(&[
            ("host", "10.0.0.5:8088"),
            ("x-forwarded-for", "203.0.113.9, 198.51.100.2"),
            ("x-forwarded-proto", "HTTPS"),
            ("x-forwarded-host", "bi.example.com"),
        ]);
        let peer: SocketAddr = "10.0.0.1:55000".parse().unwrap();

        let one = ProxyFix::new(1).resolve(&h, Some(peer));
        assert_eq!(one.client_addr.as_deref(), Some("198.51.100.2"));
        assert_eq!(one.scheme, "https");
        assert_eq!(one.host.as_deref(), Some("bi.example.com"));
        assert_eq!(one.original_addr.as_deref(), Some("10.0.0.1"));
        assert_eq!(one.original_host.as_deref(), Some("10.0.0.5:8088"));

        let two = ProxyFix::new(2).resolve(&h, Some(peer));
        assert_eq!(two.client_addr.as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn falls_back_to_peer_without_enough_hops() {
        let h = headers(&[("x-forwarded-for", "203.0.113.9")]);
        let peer: SocketAddr = "10.0.0.1:55000".parse().unwrap();
        let info = ProxyFix::new(3).resolve(&h, Some(peer));
        assert_eq!(info.client_addr.as_deref(), Some("10.0.0.1"));
        assert_eq!(info.scheme, "http");
        assert_eq!(info.host, None);
    }

    #[tokio::test]
    async fn middleware_rewrites_host_and_exposes_info() {
        let app = Router::new()
            .route(
                "/whoami",
                get(
                    |Extension(info): Extension<ForwardedInfo>, headers: HeaderMap| async move {
                        format!(
                            "{}|{}|{}",
                            info.client_addr.unwrap_or_default(),
                            info.scheme,
                            headers
                                .get(header::HOST)
                                .and_then(|v| v.to_str().ok())
                                .unwrap_or_default()
                        )
                    },
                ),
            )
            .layer(middleware::from_fn_with_state(ProxyFix::new(1), proxy_fix));

        let res = app
            .oneshot(
                HttpRequest::get("/whoami")
                    .header("host", "internal:8088")
                    .header("x-forwarded-for", "203.0.113.9")
                    .header("x-forwarded-proto", "https")
                    .header("x-forwarded-host", "bi.example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = axum::body::to_bytes(res.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"203.0.113.9|https|bi.example.com");
    }
}
