//! Options for [`CacheMiddleware`](super::CacheMiddleware).

use std::sync::Arc;
use std::time::Duration;

use super::{CacheStore, MemoryStore};
use crate::{Method, Request};

/// Lifetime given to new entries unless configured otherwise (5 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Largest response body that will be cached unless configured otherwise (1 MiB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// Derives the cache key for a request.
pub type KeyGenerator = Arc<dyn Fn(&Request) -> String + Send + Sync>;

/// Returns `true` for requests that must bypass the cache entirely.
pub type SkipPredicate = Arc<dyn Fn(&Request) -> bool + Send + Sync>;

/// Cache middleware configuration.
///
/// | Setting          | Default                                      |
/// |------------------|----------------------------------------------|
/// | TTL              | 5 minutes                                    |
/// | Methods          | `GET`                                        |
/// | Store            | a fresh [`MemoryStore`]                      |
/// | Key generator    | `METHOD:URI`, e.g. `GET:/items?page=2`       |
/// | Skip predicate   | skip when an `Authorization` header is sent  |
/// | Max body size    | 1 MiB                                        |
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use rttp_cache::Method;
/// use rttp_cache::cache::CacheConfig;
///
/// let config = CacheConfig::new()
///     .ttl(Duration::from_secs(30))
///     .methods([Method::Get, Method::Head])
///     .max_body_size(64 * 1024)
///     .skip_cache(|req| req.path().starts_with("/admin"));
/// ```
#[derive(Clone)]
pub struct CacheConfig {
    pub(crate) ttl: Duration,
    pub(crate) methods: Vec<Method>,
    pub(crate) store: Arc<dyn CacheStore>,
    pub(crate) key_generator: KeyGenerator,
    pub(crate) skip_cache: SkipPredicate,
    pub(crate) max_body_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheConfig {
    /// Creates a configuration with the defaults listed above.
    pub fn new() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            methods: vec![Method::Get],
            store: Arc::new(MemoryStore::new()),
            key_generator: Arc::new(default_key),
            skip_cache: Arc::new(has_authorization),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }

    /// Sets how long new entries stay fresh. Also advertised to clients as
    /// `Cache-Control: max-age`.
    #[must_use]
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Replaces the set of methods eligible for caching.
    #[must_use]
    pub fn methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.methods = methods.into_iter().collect();
        self
    }

    /// Uses `store` for entries. Keep a clone of the `Arc` to inspect or
    /// invalidate the store from elsewhere.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.store = store;
        self
    }

    /// Replaces the cache key derivation.
    #[must_use]
    pub fn key_generator<F>(mut self, generator: F) -> Self
    where
        F: Fn(&Request) -> String + Send + Sync + 'static,
    {
        self.key_generator = Arc::new(generator);
        self
    }

    /// Replaces the bypass predicate. The default (skip authorized requests)
    /// is dropped, so include that check yourself if you still want it.
    #[must_use]
    pub fn skip_cache<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Request) -> bool + Send + Sync + 'static,
    {
        self.skip_cache = Arc::new(predicate);
        self
    }

    /// Responses with a body larger than `bytes` are passed through uncached.
    #[must_use]
    pub fn max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = bytes;
        self
    }

    pub(crate) fn is_cacheable_method(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }
}

/// The default cache key: `METHOD:URI`.
pub fn default_key(request: &Request) -> String {
    format!("{}:{}", request.method(), request.uri())
}

/// The default bypass predicate: any request carrying credentials.
pub fn has_authorization(request: &Request) -> bool {
    request.headers().contains("authorization")
}
