//! Response cache
//!
//! Maps a digest of the (trimmed, lower-cased) message to the reply it got,
//! for a fixed TTL. Expired entries are dropped when they are looked up.
//! The cache is size-bounded; reads use `peek` so LRU order stays insertion
//! order, which with a constant TTL means the entry closest to expiry is the
//! one evicted.

use lru::LruCache;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::{CacheSettings, MAX_DURATION_SECS};
use crate::locking::lock;

#[derive(Debug, Clone)]
struct CacheEntry {
    response: String,
    expires_at: Instant,
}

/// TTL-expiring, size-bounded reply cache
pub struct ResponseCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
    enabled: bool,
}

/// Cache key for a message: SHA-256 of its trimmed, lower-cased text
pub fn cache_key(message: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(message.trim().to_lowercase().as_bytes());
    hex::encode(hasher.finalize())
}

impl ResponseCache {
    /// * `capacity` - Maximum number of replies kept
    /// * `ttl` - How long a reply stays visible, capped at 30 days
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl: ttl.min(Duration::from_secs(MAX_DURATION_SECS)),
            enabled: true,
        }
    }

    pub fn from_settings(settings: &CacheSettings) -> Self {
        let mut cache = Self::new(
            settings.effective_max_entries(),
            Duration::from_secs(settings.ttl_secs),
        );
        cache.enabled = settings.enabled;
        cache
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn get(&self, message: &str) -> Option<String> {
        self.get_at(message, Instant::now())
    }

    /// Look up a reply as of `now`; an expired entry is evicted
    pub fn get_at(&self, message: &str, now: Instant) -> Option<String> {
        if !self.enabled {
            return None;
        }

        let key = cache_key(message);
        let mut entries = lock(&self.entries);

        let expired = match entries.peek(&key) {
            Some(entry) if now < entry.expires_at => return Some(entry.response.clone()),
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.pop(&key);
            debug!("cache entry expired");
        }
        None
    }

    pub fn put(&self, message: &str, response: &str) {
        self.put_at(message, response, Instant::now());
    }

    /// Store a reply that stays visible until `now + ttl`
    pub fn put_at(&self, message: &str, response: &str, now: Instant) {
        if !self.enabled {
            return;
        }

        let key = cache_key(message);
        let entry = CacheEntry {
            response: response.to_string(),
            expires_at: now + self.ttl,
        };

        let mut entries = lock(&self.entries);
        // Re-inserting must move the key to the back of the eviction order
        entries.pop(&key);
        if let Some((evicted, _)) = entries.push(key, entry) {
            debug!("cache full, evicted {}", &evicted[..8.min(evicted.len())]);
        }
    }

    /// Entries currently stored, expired ones included until looked up
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        lock(&self.entries).clear();
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::from_settings(&CacheSettings::default())
    }
}
