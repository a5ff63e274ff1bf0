//! Response caching — an in-process HTTP cache in front of your handlers.
//!
//! [`CacheMiddleware`] stores successful responses to cacheable requests and
//! replays them until they expire, answering `If-None-Match` and
//! `If-Modified-Since` with `304 Not Modified` along the way.
//!
//! ## Pieces
//!
//! - [`CacheEntry`] — one stored response plus its ETag and timestamps.
//! - [`CacheStore`] — storage contract; [`MemoryStore`] is the built-in,
//!   lock-guarded in-memory implementation with lazy expiration.
//! - [`CaptureWriter`] — records what a handler writes while forwarding it.
//! - [`CacheConfig`] — TTL, methods, store, key derivation, bypass rule and
//!   body size limit.
//! - [`clear_cache`], [`invalidate_cache`] and [`CacheHandle`] — invalidation
//!   after writes.
//!
//! ## Wire behavior
//!
//! | Outcome  | Status          | Headers added                                              |
//! |----------|-----------------|------------------------------------------------------------|
//! | Miss     | handler's       | `ETag`, `Last-Modified`, `Cache-Control`, `X-Cache: MISS`  |
//! | Hit      | stored          | stored headers, `X-Cache: HIT`, `Age`                      |
//! | Not mod. | `304`           | `ETag`                                                     |
//! | Bypass   | handler's       | *(none)*                                                   |

pub mod capture;
pub mod config;
pub mod entry;
pub mod invalidation;
pub mod middleware;
pub mod store;

pub use capture::CaptureWriter;
pub use config::{CacheConfig, DEFAULT_MAX_BODY_SIZE, DEFAULT_TTL};
pub use entry::{CacheEntry, etag_for};
pub use invalidation::{CacheHandle, clear_cache, invalidate_cache};
pub use middleware::{CacheMiddleware, X_CACHE, is_hop_by_hop};
pub use store::{CacheStore, MemoryStore};
