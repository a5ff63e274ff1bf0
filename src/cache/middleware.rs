//! The response cache middleware.

use std::pin::Pin;
use std::sync::Arc;
use std::time::SystemTime;

use tracing::{debug, warn};

use super::{CacheConfig, CacheEntry, CacheHandle, CaptureWriter, etag_for};
use crate::{
    Request, Response, StatusCode,
    context::Context,
    http::{Headers, ResponseWriter},
    middleware::{Middleware, Next},
};

/// Response header reporting whether the cache served the response.
pub const X_CACHE: &str = "X-Cache";

// Connection-scoped headers that must never be stored or replayed.
const HOP_BY_HOP: [&str; 8] = [
    "Connection",
    "Keep-Alive",
    "Proxy-Authenticate",
    "Proxy-Authorization",
    "TE",
    "Trailers",
    "Transfer-Encoding",
    "Upgrade",
];

/// Returns `true` for headers that only apply to a single connection
/// (case-insensitive).
///
/// ```
/// use rttp_cache::cache::is_hop_by_hop;
///
/// assert!(is_hop_by_hop("transfer-encoding"));
/// assert!(!is_hop_by_hop("Content-Type"));
/// ```
pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| h.eq_ignore_ascii_case(name))
}

/// Serves repeat requests from a [`CacheStore`](super::CacheStore) and
/// answers conditional requests with `304 Not Modified`.
///
/// # Behavior
///
/// - Requests whose method is not in the allow-list, or for which the skip
///   predicate returns `true`, go straight to the next layer untouched.
/// - On a hit, `If-None-Match` is compared against the stored ETag (one pair
///   of surrounding quotes is ignored on both sides). When that header is
///   absent, `If-Modified-Since` is compared against the stored modification
///   time. A present `If-None-Match` decides on its own: a stale ETag replays
///   the full response even if `If-Modified-Since` would have matched.
///   Either match produces an empty `304`. Otherwise the stored response is
///   replayed with `X-Cache: HIT` and an `Age` header.
/// - On a miss the finished downstream response is written through a
///   [`CaptureWriter`]. Unless its status is `>= 400` or its body exceeds the
///   size limit, it is stored and the live response gains `ETag`,
///   `Last-Modified`, `Cache-Control: max-age=N, public` and `X-Cache: MISS`.
///
/// Every request, cached or not, receives a [`CacheHandle`] in its
/// extensions. Nothing here fails a request: any problem degrades to serving
/// the downstream response uncached.
///
/// Concurrent misses for the same key are not coalesced; each one runs the
/// downstream handler and the last store wins.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use rttp_cache::{Response, StatusCode, context::Context};
/// use rttp_cache::cache::{CacheConfig, CacheMiddleware};
/// use rttp_cache::middleware::Pipeline;
///
/// let cache = CacheMiddleware::new(CacheConfig::new().ttl(Duration::from_secs(60)));
/// let handle = cache.store();
///
/// let pipeline = Pipeline::new(|_ctx: Context| async {
///     Response::new(StatusCode::Ok).body("expensive")
/// })
/// .layer(cache);
///
/// // Later, after the underlying data changes:
/// handle.clear();
/// # drop(pipeline);
/// ```
pub struct CacheMiddleware {
    config: Arc<CacheConfig>,
}

impl Default for CacheMiddleware {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl CacheMiddleware {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// A handle to this middleware's store, for invalidation from
    /// application code.
    pub fn store(&self) -> CacheHandle {
        CacheHandle::new(Arc::clone(&self.config.store))
    }
}

impl Middleware for CacheMiddleware {
    fn handle(
        &self,
        mut ctx: Context,
        next: Next,
    ) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        let config = Arc::clone(&self.config);
        Box::pin(async move {
            ctx.extensions_mut()
                .insert(CacheHandle::new(Arc::clone(&config.store)));

            let request = ctx.request();
            if !config.is_cacheable_method(request.method()) || (config.skip_cache)(request) {
                debug!(
                    method = %request.method(),
                    path = %request.path(),
                    "request not eligible for caching"
                );
                return next.run(ctx).await;
            }

            let key = (config.key_generator)(request);
            if let Some(entry) = config.store.get(&key) {
                return serve_cached(request, &key, &entry);
            }

            debug!(key = %key, "cache miss");
            let response = next.run(ctx).await;
            capture_and_store(&config, key, response)
        })
    }
}

// Answers a request from a stored entry, either as a 304 or a full replay.
fn serve_cached(request: &Request, key: &str, entry: &CacheEntry) -> Response {
    if is_not_modified(request, entry) {
        debug!(key = %key, "cache hit, not modified");
        return Response::new(StatusCode::NotModified).header("ETag", entry.etag());
    }

    debug!(key = %key, "cache hit");
    let mut response = Response::default();
    replay(entry, &mut response);
    response
}

fn is_not_modified(request: &Request, entry: &CacheEntry) -> bool {
    let headers = request.headers();
    if let Some(candidate) = headers.get("If-None-Match") {
        return unquote(candidate) == unquote(entry.etag());
    }

    headers
        .get("If-Modified-Since")
        .and_then(|since| httpdate::parse_http_date(since).ok())
        .is_some_and(|since| entry.last_modified() <= since)
}

// Strips one pair of surrounding double quotes, if present.
fn unquote(tag: &str) -> &str {
    let tag = tag.trim();
    tag.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(tag)
}

fn replay(entry: &CacheEntry, sink: &mut dyn ResponseWriter) {
    let headers = sink.headers_mut();
    for (name, value) in entry.headers().iter() {
        headers.insert(name, value);
    }
    headers.set(X_CACHE, "HIT");
    headers.set("Age", entry.age(SystemTime::now()).as_secs().to_string());

    sink.write_status(entry.status());
    if let Err(error) = sink.write_all(entry.body()) {
        warn!(error = %error, "failed to write cached body");
    }
}

// Passes the downstream response through to the client, storing a copy when
// it is cacheable.
fn capture_and_store(config: &CacheConfig, key: String, downstream: Response) -> Response {
    let mut live = Response::default().keep_alive(downstream.is_keep_alive());

    let captured = {
        let mut capture = CaptureWriter::new(&mut live);
        match downstream.write_into(&mut capture) {
            Ok(()) => Some((capture.status(), capture.into_body())),
            Err(error) => {
                warn!(key = %key, error = %error, "failed to capture response");
                None
            }
        }
    };
    let Some((status, body)) = captured else {
        return live;
    };

    if status.is_error() {
        debug!(key = %key, status = status.as_u16(), "error response not cached");
        return live;
    }
    if body.len() > config.max_body_size {
        debug!(
            key = %key,
            size = body.len(),
            limit = config.max_body_size,
            "response too large to cache"
        );
        return live;
    }

    let stored: Headers = live
        .headers()
        .iter()
        .filter(|(name, _)| !is_hop_by_hop(name))
        .collect();
    let etag = etag_for(&body);
    let entry = CacheEntry::new(status, stored, body).with_etag(etag.clone());

    let headers = live.headers_mut();
    headers.set("ETag", etag);
    headers.set("Last-Modified", httpdate::fmt_http_date(entry.last_modified()));
    headers.set(
        "Cache-Control",
        format!("max-age={}, public", config.ttl.as_secs()),
    );
    headers.set(X_CACHE, "MISS");

    config.store.set(&key, entry, config.ttl);
    live
}
