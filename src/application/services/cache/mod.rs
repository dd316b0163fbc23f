use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::application::ports::cache_backend::CacheBackend;

pub mod single_flight;

use single_flight::SingleFlight;

const PING_KEY: &str = "vista:health:ping";

/// Typed cache over a [`CacheBackend`].
///
/// Values are stored as JSON. `memoize` computes a missing value at most
/// once per key at a time inside this process; concurrent callers wait
/// for the first one and then read its result from the backend.
pub struct Cache {
    backend: Arc<dyn CacheBackend>,
    default_timeout: Duration,
    flights: SingleFlight,
}

impl Cache {
    pub fn new(backend: Arc<dyn CacheBackend>, default_timeout: Duration) -> Self {
        Self {
            backend,
            default_timeout,
            flights: SingleFlight::new(),
        }
    }

    pub fn backend_kind(&self) -> &'static str {
        self.backend.kind()
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Backend failures and undecodable entries read as misses.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = match self.backend.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = ?e, key, backend = self.backend.kind(), "cache_get_failed");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(error = ?e, key, "cache_entry_undecodable");
                None
            }
        }
    }

    /// Stores `value`; JSON `null` is never stored. `timeout` of `None`
    /// uses the default timeout and a zero timeout never expires.
    pub async fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        timeout: Option<Duration>,
    ) -> anyhow::Result<()> {
        let bytes = serde_json::to_vec(value)?;
        if bytes == b"null" {
            return Ok(());
        }
        self.backend
            .set(key, bytes, self.backend_timeout(timeout))
            .await
    }

    pub async fn delete(&self, key: &str) -> anyhow::Result<bool> {
        self.backend.delete(key).await
    }

    pub async fn clear(&self) -> anyhow::Result<()> {
        self.backend.clear().await
    }

    /// Round trip to the backend; unlike `get`, failures are returned.
    pub async fn ping(&self) -> anyhow::Result<()> {
        self.backend.get(PING_KEY).await.map(|_| ())
    }

    /// Returns the cached value for `key` or computes, stores and returns it.
    ///
    /// Errors from `compute` propagate and are not cached. A backend that
    /// stores nothing skips the per-key lock entirely.
    pub async fn memoize<T, F, Fut>(
        &self,
        key: &str,
        timeout: Option<Duration>,
        compute: F,
    ) -> anyhow::Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        if !self.backend.stores() {
            return compute().await;
        }
        if let Some(hit) = self.get::<T>(key).await {
            return Ok(hit);
        }
        let mut flight = Some(self.flights.acquire(key).await);
        if let Some(hit) = self.get::<T>(key).await {
            return Ok(hit);
        }
        // The previous holder produced nothing storable; later waiters
        // would only repeat its work one at a time.
        if flight.as_ref().is_some_and(|f| f.waited()) {
            flight = None;
        }
        let value = compute().await?;
        if let Err(e) = self.set(key, &value, timeout).await {
            tracing::warn!(error = ?e, key, backend = self.backend.kind(), "cache_set_failed");
        }
        drop(flight);
        Ok(value)
    }

    /// Wraps `func` so each call is memoized under `key(&args)`.
    pub fn cached_fn<A, T, K, F, Fut>(
        self: &Arc<Self>,
        timeout: Option<Duration>,
        key: K,
        func: F,
    ) -> CachedFn<A, T>
    where
        K: Fn(&A) -> String + Send + Sync + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        CachedFn {
            cache: self.clone(),
            timeout,
            key: Arc::new(key),
            func: Arc::new(move |args| func(args).boxed()),
        }
    }

    fn backend_timeout(&self, timeout: Option<Duration>) -> Option<Duration> {
        let timeout = timeout.unwrap_or(self.default_timeout);
        if timeout.is_zero() { None } else { Some(timeout) }
    }
}

type KeyFn<A> = Arc<dyn Fn(&A) -> String + Send + Sync>;
type BoxedFn<A, T> = Arc<dyn Fn(A) -> BoxFuture<'static, anyhow::Result<T>> + Send + Sync>;

/// A function whose results are memoized under a key derived from its arguments.
pub struct CachedFn<A, T> {
    cache: Arc<Cache>,
    timeout: Option<Duration>,
    key: KeyFn<A>,
    func: BoxedFn<A, T>,
}

impl<A, T> Clone for CachedFn<A, T> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            timeout: self.timeout,
            key: self.key.clone(),
            func: self.func.clone(),
        }
    }
}

impl<A, T> CachedFn<A, T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn cache_key(&self, args: &A) -> String {
        (self.key)(args)
    }

    pub async fn call(&self, args: A) -> anyhow::Result<T> {
        let key = (self.key)(&args);
        let func = self.func.clone();
        self.cache
            .memoize(&key, self.timeout, move || func(args))
            .await
    }
}
