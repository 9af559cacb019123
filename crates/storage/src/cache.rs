//! Bounded, time-expiring cache of materialized query results.
//!
//! Keys are digests over the query type and sorted parameter pairs. The
//! canonical pre-digest string is kept with each entry so write-through
//! invalidation can tag-match `domain:<domain>` against it: any write
//! drops every entry referencing the written domain. Intentionally coarse
//! (over-invalidates) so no per-query dependency sets need tracking.
//!
//! One mutex guards the whole map. Expiry is lazy on access; when full,
//! the single oldest-inserted entry is evicted (FIFO, not LRU).

use std::collections::HashMap;
use std::env;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use insight_store_core::{CacheStats, Insight};
use sha2::{Digest as _, Sha256};

/// Default time-to-live for cached results, in seconds.
const DEFAULT_TTL_SECS: u64 = 3600;

/// Default maximum number of cached result sets.
const DEFAULT_CAPACITY: usize = 1000;

/// Cache TTL in seconds from environment or default (3600).
#[must_use]
pub fn cache_ttl_secs() -> u64 {
    env::var("INSIGHT_STORE_CACHE_TTL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_TTL_SECS)
}

/// Cache capacity from environment or default (1000).
#[must_use]
pub fn cache_capacity() -> usize {
    env::var("INSIGHT_STORE_CACHE_CAPACITY")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_CAPACITY)
}

/// Canonical digest key for one query.
#[derive(Debug, Clone)]
pub struct CacheKey {
    digest: String,
    canonical: String,
}

impl CacheKey {
    /// Build a key from the query type and its parameter pairs. Pairs are
    /// sorted by name so parameter order never splits cache entries.
    #[must_use]
    pub fn new(query_type: &str, params: &[(&str, String)]) -> Self {
        let mut pairs: Vec<(&str, &str)> =
            params.iter().map(|(k, v)| (*k, v.as_str())).collect();
        pairs.sort_unstable();

        let mut canonical = query_type.to_owned();
        for (k, v) in pairs {
            canonical.push('|');
            canonical.push_str(k);
            canonical.push(':');
            canonical.push_str(v);
        }

        let digest = hex::encode(Sha256::digest(canonical.as_bytes()));
        Self { digest, canonical }
    }
}

struct CacheEntry {
    canonical: String,
    results: Vec<Insight>,
    inserted_at: Instant,
}

struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    hits: u64,
    misses: u64,
}

/// Query-result cache guarded by a single mutex.
pub struct QueryCache {
    inner: Mutex<CacheInner>,
    ttl: Duration,
    capacity: usize,
}

impl QueryCache {
    /// Cache with TTL and capacity from the environment or defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(Duration::from_secs(cache_ttl_secs()), cache_capacity())
    }

    #[must_use]
    pub fn with_settings(ttl: Duration, capacity: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                hits: 0,
                misses: 0,
            }),
            ttl,
            capacity,
        }
    }

    // A poisoned lock only means another thread panicked mid-update of
    // plain counters/maps; the data is still coherent enough for a cache.
    fn lock(&self) -> std::sync::MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetch a live entry, evicting it lazily if the TTL has lapsed.
    pub fn get(&self, key: &CacheKey) -> Option<Vec<Insight>> {
        let mut inner = self.lock();
        if let Some(entry) = inner.entries.get(&key.digest) {
            if entry.inserted_at.elapsed() < self.ttl {
                let results = entry.results.clone();
                inner.hits += 1;
                return Some(results);
            }
            inner.entries.remove(&key.digest);
        }
        inner.misses += 1;
        None
    }

    /// Insert a materialized result set, evicting the oldest entry first
    /// when at capacity.
    pub fn insert(&self, key: &CacheKey, results: Vec<Insight>) {
        let mut inner = self.lock();
        if inner.entries.len() >= self.capacity && !inner.entries.contains_key(&key.digest) {
            let oldest = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(digest, _)| digest.clone());
            if let Some(digest) = oldest {
                inner.entries.remove(&digest);
            }
        }
        inner.entries.insert(
            key.digest.clone(),
            CacheEntry {
                canonical: key.canonical.clone(),
                results,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drop every entry whose canonical key references the domain.
    pub fn invalidate_domain(&self, domain: &str) {
        let tag = format!("domain:{domain}");
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| !entry.canonical.contains(&tag));
        let dropped = before - inner.entries.len();
        if dropped > 0 {
            tracing::debug!(domain, dropped, "Invalidated cached queries");
        }
    }

    /// Drop everything. Used after index rebuilds.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        let lookups = inner.hits + inner.misses;
        CacheStats {
            entries: inner.entries.len() as u64,
            hits: inner.hits,
            misses: inner.misses,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                inner.hits as f64 / lookups as f64
            },
        }
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}
