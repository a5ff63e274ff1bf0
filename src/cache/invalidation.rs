//! Store-agnostic invalidation entry points.
//!
//! Handlers that change the data behind a cached resource call these after
//! the write so later reads are recomputed.

use std::sync::Arc;

use tracing::debug;

use super::CacheStore;

/// Drops every cached response.
pub fn clear_cache(store: &dyn CacheStore) {
    store.clear();
    debug!("response cache cleared");
}

/// Drops the cached response stored under `key`, if any.
pub fn invalidate_cache(store: &dyn CacheStore, key: &str) {
    store.delete(key);
    debug!(key = %key, "response cache entry invalidated");
}

/// Cheaply cloneable reference to the store used by a
/// [`CacheMiddleware`](super::CacheMiddleware).
///
/// The middleware places one in every request's
/// [`Extensions`](crate::context::Extensions), so a downstream handler can
/// invalidate what it just changed:
///
/// ```rust
/// use rttp_cache::{Response, StatusCode, context::Context};
/// use rttp_cache::cache::CacheHandle;
///
/// async fn update_item(ctx: Context) -> Response {
///     // ... persist the change ...
///     if let Some(cache) = ctx.extensions().get::<CacheHandle>() {
///         cache.invalidate("GET:/items");
///     }
///     Response::new(StatusCode::NoContent)
/// }
/// ```
#[derive(Clone)]
pub struct CacheHandle {
    store: Arc<dyn CacheStore>,
}

impl CacheHandle {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// See [`clear_cache`].
    pub fn clear(&self) {
        clear_cache(&*self.store);
    }

    /// See [`invalidate_cache`].
    pub fn invalidate(&self, key: &str) {
        invalidate_cache(&*self.store, key);
    }

    /// The underlying store.
    pub fn store(&self) -> &dyn CacheStore {
        &*self.store
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::cache::{CacheEntry, MemoryStore};
    use crate::http::{Headers, StatusCode};

    fn seeded() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for key in ["GET:/a", "GET:/b"] {
            let entry = CacheEntry::new(StatusCode::Ok, Headers::new(), key.to_owned());
            store.set(key, entry, Duration::from_secs(60));
        }
        store
    }

    #[test]
    fn invalidate_removes_one_key() {
        let store = seeded();
        invalidate_cache(&*store, "GET:/a");
        assert!(store.get("GET:/a").is_none());
        assert!(store.get("GET:/b").is_some());
    }

    #[test]
    fn clear_removes_everything() {
        let store = seeded();
        clear_cache(&*store);
        assert!(store.is_empty());
    }

    #[test]
    fn handle_forwards_to_shared_store() {
        let store = seeded();
        let handle = CacheHandle::new(store.clone());
        handle.invalidate("GET:/b");
        assert!(store.get("GET:/b").is_none());
        assert!(handle.store().get("GET:/a").is_some());
        handle.clone().clear();
        assert!(store.is_empty());
    }
}
