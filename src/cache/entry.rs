//! The cached representation of one HTTP response.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use sha2::{Digest, Sha256};
use tokio::time::Instant;

use crate::http::{Headers, StatusCode};

/// One stored response: status, headers, body, and the validators used to
/// answer conditional requests.
///
/// An entry is built once after a cache miss completes and is never modified
/// afterwards except by [`seal`](Self::seal), which the store calls exactly
/// once while writing it. Replacing a cached response means writing a new
/// entry under the same key.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use rttp_cache::cache::CacheEntry;
/// use rttp_cache::http::{Headers, StatusCode};
///
/// let mut entry = CacheEntry::new(StatusCode::Ok, Headers::new(), "hello");
/// assert!(entry.etag().is_empty());
///
/// entry.seal(Duration::from_secs(60));
/// assert_eq!(entry.etag().len(), 64);
/// assert!(entry.expires_at().is_some());
/// ```
#[derive(Debug, Clone)]
pub struct CacheEntry {
    body: Bytes,
    status: StatusCode,
    headers: Headers,
    expiration: Option<Instant>,
    last_modified: SystemTime,
    etag: String,
}

impl CacheEntry {
    /// Creates an unsealed entry stamped with the current time as its
    /// modification time.
    ///
    /// The timestamp is truncated to whole seconds, the resolution of an HTTP
    /// date, so a client echoing `Last-Modified` back in `If-Modified-Since`
    /// compares equal.
    pub fn new(status: StatusCode, headers: Headers, body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            status,
            headers,
            expiration: None,
            last_modified: whole_seconds(SystemTime::now()),
            etag: String::new(),
        }
    }

    /// Uses `etag` instead of deriving one from the body at write time.
    #[must_use]
    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = etag.into();
        self
    }

    /// Overrides the modification time (truncated to whole seconds).
    #[must_use]
    pub fn with_last_modified(mut self, at: SystemTime) -> Self {
        self.last_modified = whole_seconds(at);
        self
    }

    /// Prepares the entry for storage: sets its expiration to `now + ttl` and
    /// fills a blank ETag with the body fingerprint.
    ///
    /// A `ttl` too large to represent as a deadline (such as [`Duration::MAX`])
    /// leaves the entry without an expiration, so it never expires.
    ///
    /// Store implementations call this from [`CacheStore::set`]; callers never
    /// set an expiration directly.
    ///
    /// [`CacheStore::set`]: super::CacheStore::set
    pub fn seal(&mut self, ttl: Duration) {
        self.expiration = Instant::now().checked_add(ttl);
        if self.etag.is_empty() {
            self.etag = etag_for(&self.body);
        }
    }

    /// Returns `true` once `now` is past the expiration. Unsealed entries
    /// never expire.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expiration.is_some_and(|at| now > at)
    }

    /// Time elapsed between the modification time and `now`, zero if the
    /// clock went backwards.
    pub fn age(&self, now: SystemTime) -> Duration {
        now.duration_since(self.last_modified).unwrap_or_default()
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn expires_at(&self) -> Option<Instant> {
        self.expiration
    }

    pub fn last_modified(&self) -> SystemTime {
        self.last_modified
    }

    pub fn etag(&self) -> &str {
        &self.etag
    }
}

/// Hex-encoded SHA-256 of `body`, the fingerprint used as an ETag.
pub fn etag_for(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}

fn whole_seconds(at: SystemTime) -> SystemTime {
    match at.duration_since(UNIX_EPOCH) {
        Ok(since_epoch) => UNIX_EPOCH + Duration::from_secs(since_epoch.as_secs()),
        Err(_) => at,
    }
}
