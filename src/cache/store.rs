//! Storage backends for cached responses.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::Instant;
use tracing::trace;

use super::CacheEntry;

/// Key/value storage for [`CacheEntry`] values with expiration.
///
/// All operations are infallible: a missing or expired key is reported as
/// `None`, and removing something that is not there is a no-op.
/// Implementations must be safe to call from many request tasks at once.
pub trait CacheStore: Send + Sync {
    /// Returns a copy of the entry under `key` if it exists and has not
    /// expired. An expired entry is evicted by the lookup.
    fn get(&self, key: &str) -> Option<CacheEntry>;

    /// Stores `entry` under `key`, replacing whatever was there. The entry is
    /// [sealed](CacheEntry::seal) with `ttl` first.
    fn set(&self, key: &str, entry: CacheEntry, ttl: Duration);

    /// Removes `key` if present.
    fn delete(&self, key: &str);

    /// Removes every entry.
    fn clear(&self);
}

/// In-process store backed by a `HashMap` behind a readers-writer lock.
///
/// Expiration is lazy: an entry is only checked (and evicted) when it is
/// read, so entries that are never read again stay resident until
/// [`purge_expired`](Self::purge_expired), [`delete`](CacheStore::delete) or
/// [`clear`](CacheStore::clear) removes them.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use rttp_cache::cache::{CacheEntry, CacheStore, MemoryStore};
/// use rttp_cache::http::{Headers, StatusCode};
///
/// let store = MemoryStore::new();
/// let entry = CacheEntry::new(StatusCode::Ok, Headers::new(), "cached");
/// store.set("GET:/", entry, Duration::from_secs(30));
///
/// let hit = store.get("GET:/").unwrap();
/// assert_eq!(&hit.body()[..], b"cached");
/// assert!(store.get("GET:/missing").is_none());
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of resident entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    // Second half of `get`, run after the read lock saw an expired entry.
    // A concurrent `set` may have replaced it since, so expiry is re-checked
    // under the write lock and a fresh entry is returned instead of evicted.
    fn evict_expired(&self, key: &str, now: Instant) -> Option<CacheEntry> {
        let mut entries = self.entries.write();
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                trace!(key = %key, "evicted expired cache entry");
                None
            }
            Some(entry) => Some(entry.clone()),
            None => None,
        }
    }

    /// Drops every entry that has expired and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &str) -> Option<CacheEntry> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired(now) => return Some(entry.clone()),
                Some(_) => {}
            }
        }
        self.evict_expired(key, now)
    }

    fn set(&self, key: &str, mut entry: CacheEntry, ttl: Duration) {
        entry.seal(ttl);
        self.entries.write().insert(key.to_owned(), entry);
    }

    fn delete(&self, key: &str) {
        self.entries.write().remove(key);
    }

    fn clear(&self) {
        self.entries.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::cache::etag_for;
    use crate::http::{Headers, StatusCode};

    fn entry(body: &str) -> CacheEntry {
        CacheEntry::new(StatusCode::Ok, Headers::new(), body.to_owned())
    }

    #[test]
    fn fresh_entry_round_trips() {
        let store = MemoryStore::new();
        store.set("k", entry("payload"), Duration::from_secs(60));
        let hit = store.get("k").unwrap();
        assert_eq!(&hit.body()[..], b"payload");
        assert_eq!(hit.status(), StatusCode::Ok);
        assert!(!hit.etag().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_is_a_miss_and_evicted() {
        let store = MemoryStore::new();
        store.set("k", entry("payload"), Duration::from_millis(100));
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(store.get("k").is_none());
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn entry_is_served_until_ttl_elapses() {
        let store = MemoryStore::new();
        store.set("k", entry("payload"), Duration::from_secs(10));
        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(store.get("k").is_some());
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(store.get("k").is_none());
    }

    #[test]
    fn set_overwrites() {
        let store = MemoryStore::new();
        store.set("k", entry("first"), Duration::from_secs(60));
        store.set("k", entry("second"), Duration::from_secs(60));
        assert_eq!(&store.get("k").unwrap().body()[..], b"second");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn clear_is_idempotent() {
        let store = MemoryStore::new();
        store.clear();
        assert!(store.is_empty());

        store.set("a", entry("1"), Duration::from_secs(60));
        store.set("b", entry("2"), Duration::from_secs(60));
        store.clear();
        assert!(store.get("a").is_none());
        assert!(store.get("b").is_none());
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn delete_only_touches_its_key() {
        let store = MemoryStore::new();
        store.set("a", entry("1"), Duration::from_secs(60));
        store.set("b", entry("2"), Duration::from_secs(60));
        store.delete("a");
        store.delete("missing");
        assert!(store.get("a").is_none());
        assert_eq!(&store.get("b").unwrap().body()[..], b"2");
    }

    #[tokio::test(start_paused = true)]
    async fn purge_drops_only_expired() {
        let store = MemoryStore::new();
        store.set("short", entry("1"), Duration::from_secs(1));
        store.set("long", entry("2"), Duration::from_secs(60));
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.get("long").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn set_between_expiry_check_and_eviction_survives() {
        let store = MemoryStore::new();
        store.set("k", entry("stale"), Duration::from_secs(1));
        tokio::time::advance(Duration::from_secs(2)).await;

        // A reader observes the stale entry as expired at `seen`...
        let seen = Instant::now();
        assert!(store.entries.read()["k"].is_expired(seen));

        // ...a writer replaces it before the reader takes the write lock...
        store.set("k", entry("fresh"), Duration::from_secs(60));

        // ...and the reader's eviction leaves the fresh entry in place.
        let hit = store.evict_expired("k", seen).unwrap();
        assert_eq!(&hit.body()[..], b"fresh");
        assert_eq!(&store.get("k").unwrap().body()[..], b"fresh");
    }

    #[tokio::test(start_paused = true)]
    async fn eviction_still_removes_unreplaced_entry() {
        let store = MemoryStore::new();
        store.set("k", entry("stale"), Duration::from_secs(1));
        tokio::time::advance(Duration::from_secs(2)).await;

        assert!(store.evict_expired("k", Instant::now()).is_none());
        assert!(store.is_empty());
        assert!(store.evict_expired("k", Instant::now()).is_none());
    }

    #[test]
    fn fresh_set_survives_readers_evicting_expired_entries() {
        let store = Arc::new(MemoryStore::new());
        for round in 0..200 {
            // Zero TTL: the seed is expired as soon as the clock moves.
            store.set("hot", entry("stale"), Duration::ZERO);

            let readers: Vec<_> = (0..4)
                .map(|_| {
                    let store = Arc::clone(&store);
                    thread::spawn(move || {
                        for _ in 0..50 {
                            if store.get("hot").is_some_and(|hit| &hit.body()[..] == b"fresh") {
                                return;
                            }
                        }
                    })
                })
                .collect();

            store.set("hot", entry("fresh"), Duration::from_secs(60));
            for reader in readers {
                reader.join().unwrap();
            }

            let hit = store
                .get("hot")
                .unwrap_or_else(|| panic!("round {round}: fresh entry evicted"));
            assert_eq!(&hit.body()[..], b"fresh");
        }
    }

    #[test]
    fn concurrent_access_keeps_entries_whole() {
        let store = Arc::new(MemoryStore::new());
        let workers: Vec<_> = (0..8)
            .map(|n| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let body = format!("body-{n}");
                    for _ in 0..200 {
                        store.set("shared", entry(&body), Duration::from_secs(60));
                        if let Some(hit) = store.get("shared") {
                            // Whatever writer won, its etag matches its own body.
                            assert_eq!(hit.etag(), etag_for(hit.body()));
                        }
                        store.delete("shared");
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
    }
}
