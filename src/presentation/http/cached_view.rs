use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, to_bytes};
use axum::extract::{Query, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::{HeaderValue, Method, StatusCode, header};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::application::services::cache::Cache;

pub const DEFAULT_KEY_TEMPLATE: &str = "view/{}/{}";
const MAX_CACHED_BODY: usize = 16 * 1024 * 1024;

/// Memoizes successful GET responses of the views it wraps, keyed by
/// request path and the set of query arguments.
#[derive(Clone)]
pub struct CachedView {
    cache: Arc<Cache>,
    timeout: Option<Duration>,
    key_template: Arc<str>,
}

#[derive(Serialize, Deserialize)]
struct CachedResponse {
    status: u16,
    content_type: Option<String>,
    body: Vec<u8>,
}

impl CachedView {
    pub fn new(cache: Arc<Cache>, timeout: Option<Duration>) -> Self {
        Self {
            cache,
            timeout,
            key_template: Arc::from(DEFAULT_KEY_TEMPLATE),
        }
    }

    /// Template with two `{}` slots: request path, then query hash.
    pub fn with_key_template(mut self, template: &str) -> Self {
        self.key_template = Arc::from(template);
        self
    }

    pub fn cache_key(&self, path: &str, query: Option<&str>) -> String {
        let hash = query_hash(query);
        let mut parts = self.key_template.splitn(3, "{}");
        let mut key = String::new();
        key.push_str(parts.next().unwrap_or_default());
        if let Some(mid) = parts.next() {
            key.push_str(path);
            key.push_str(mid);
        }
        if let Some(tail) = parts.next() {
            key.push_str(&hash);
            key.push_str(tail);
        }
        key
    }
}

/// Order-independent hash of the query arguments. A repeated key
/// contributes only its first value.
pub fn query_hash(query: Option<&str>) -> String {
    let mut pairs: BTreeMap<String, String> = BTreeMap::new();
    let parsed = query.and_then(|q| {
        let uri: http::Uri = format!("/?{q}").parse().ok()?;
        Query::<Vec<(String, String)>>::try_from_uri(&uri).ok()
    });
    if let Some(Query(parsed)) = parsed {
        for (k, v) in parsed {
            pairs.entry(k).or_insert(v);
        }
    }
    let mut hasher = Sha256::new();
    for (k, v) in &pairs {
        hasher.update(k.as_bytes());
        hasher.update([0u8]);
        hasher.update(v.as_bytes());
        hasher.update([0xffu8]);
    }
    hasher
        .finalize()
        .iter()
        .take(8)
        .map(|b| format!("{b:02x}"))
        .collect()
}

pub async fn cached_view(State(view): State<CachedView>, req: Request, next: Next) -> Response {
    if req.method() != Method::GET {
        return next.run(req).await;
    }
    let key = view.cache_key(req.uri().path(), req.uri().query());

    let mut passthrough: Option<Response> = None;
    let slot = &mut passthrough;
    let outcome = view
        .cache
        .memoize(&key, view.timeout, move || async move {
            let res = next.run(req).await;
            if res.status() != StatusCode::OK {
                *slot = Some(res);
                return Ok(None);
            }
            let (parts, body) = res.into_parts();
            let body = match to_bytes(body, MAX_CACHED_BODY).await {
                Ok(body) => body,
                Err(e) => return Err(anyhow::Error::from(e)),
            };
            Ok::<_, anyhow::Error>(Some(CachedResponse {
                status: parts.status.as_u16(),
                content_type: parts
                    .headers
                    .get(header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_owned),
                body: body.to_vec(),
            }))
        })
        .await;

    if let Some(res) = passthrough {
        return res;
    }
    match outcome {
        Ok(Some(cached)) => cached.into_response(),
        Ok(None) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        Err(e) => {
            tracing::error!(error = ?e, key, "cached_view_failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

impl IntoResponse for CachedResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        let mut res = Response::new(Body::from(self.body));
        *res.status_mut() = status;
        if let Some(ct) = self.content_type.and_then(|ct| HeaderValue::from_str(&ct).ok()) {
            res.headers_mut().insert(header::CONTENT_TYPE, ct);
        }
        res
    }
}
