// src/cache.rs
//! In-memory result cache keyed by request fingerprint, with absolute TTL.
//!
//! Expired entries are dropped lazily on read; there is no background sweep.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use metrics::counter;

pub const DEFAULT_CACHE_TTL_SECS: u64 = 600;

/// Finished pipeline output. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestResult {
    pub summary: String,
    /// MP3 bytes.
    pub audio: Vec<u8>,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    result: Arc<DigestResult>,
    created_at: Instant,
}

#[derive(Debug)]
pub struct ResultCache {
    ttl: Duration,
    inner: Mutex<HashMap<String, CacheEntry>>,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_CACHE_TTL_SECS))
    }
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &str) -> Option<Arc<DigestResult>> {
        self.get_at(key, Instant::now())
    }

    pub fn put(&self, key: String, result: Arc<DigestResult>) {
        self.put_at(key, result, Instant::now())
    }

    /// Lookup as of `now`. An entry exactly `ttl` old is still served.
    pub fn get_at(&self, key: &str, now: Instant) -> Option<Arc<DigestResult>> {
        let mut map = self.lock();
        let fresh = match map.get(key) {
            None => {
                counter!("digest_cache_misses_total").increment(1);
                return None;
            }
            Some(entry) => now.saturating_duration_since(entry.created_at) <= self.ttl,
        };

        if fresh {
            counter!("digest_cache_hits_total").increment(1);
            return map.get(key).map(|e| Arc::clone(&e.result));
        }

        map.remove(key);
        counter!("digest_cache_evictions_total").increment(1);
        counter!("digest_cache_misses_total").increment(1);
        None
    }

    pub fn put_at(&self, key: String, result: Arc<DigestResult>, now: Instant) {
        self.lock().insert(
            key,
            CacheEntry {
                result,
                created_at: now,
            },
        );
    }

    /// Number of stored entries, expired ones included until they are read.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        // Entries are replaced wholesale, so a poisoned map is still consistent.
        match self.inner.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }
}
