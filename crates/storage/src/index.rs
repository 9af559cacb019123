//! In-process secondary indexes over the durable store.
//!
//! Four maps (domain, category, agent, quantized quality bucket) hold
//! insertion-ordered id lists, plus one recency list of newest-first ids
//! capped at [`MAX_RECENCY_IDS`]; the durable store stays authoritative
//! for anything past the cap. Built at startup from the indexed columns
//! and updated incrementally on every successful write.
//!
//! There is no removal path: replacing an insight by id leaves the old
//! list position behind, so readers get order-preserving deduplicated
//! copies. Correctness is approximate between rebuilds, trading exactness
//! for write throughput.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use insight_store_core::IndexStats;

/// Recency list cap; oldest entries drop off once exceeded.
pub const MAX_RECENCY_IDS: usize = 10_000;

/// Quantize a quality score into a width-0.1 bucket (0 through 10).
#[must_use]
pub fn quality_bucket(score: f64) -> u8 {
    (score.clamp(0.0, 1.0) * 10.0).floor() as u8
}

/// The indexed columns of one insight, as consumed by the index.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub id: String,
    pub domain: String,
    pub category: Option<String>,
    pub agent_name: Option<String>,
    pub quality_score: f64,
}

#[derive(Default)]
struct IndexInner {
    domain: HashMap<String, Vec<String>>,
    category: HashMap<String, Vec<String>>,
    agent: HashMap<String, Vec<String>>,
    quality: HashMap<u8, Vec<String>>,
    recency: Vec<String>,
}

impl IndexInner {
    fn insert(&mut self, entry: &IndexEntry) {
        self.domain
            .entry(entry.domain.clone())
            .or_default()
            .push(entry.id.clone());
        if let Some(category) = &entry.category {
            self.category
                .entry(category.clone())
                .or_default()
                .push(entry.id.clone());
        }
        if let Some(agent) = &entry.agent_name {
            self.agent
                .entry(agent.clone())
                .or_default()
                .push(entry.id.clone());
        }
        self.quality
            .entry(quality_bucket(entry.quality_score))
            .or_default()
            .push(entry.id.clone());

        self.recency.insert(0, entry.id.clone());
        if self.recency.len() > MAX_RECENCY_IDS {
            self.recency.truncate(MAX_RECENCY_IDS);
        }
    }
}

/// Secondary index guarded by a single mutex. No database I/O happens
/// while the lock is held; rebuilds assemble a full replacement outside
/// the lock and swap it in.
pub struct SecondaryIndex {
    inner: Mutex<IndexInner>,
}

fn dedup_preserving(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

impl SecondaryIndex {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(IndexInner::default()),
        }
    }

    // Map contents stay coherent even if a writer panicked mid-append.
    fn lock(&self) -> std::sync::MutexGuard<'_, IndexInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append one freshly written insight to every relevant list.
    pub fn insert(&self, entry: &IndexEntry) {
        self.lock().insert(entry);
    }

    /// Ids for one domain, deduplicated, insertion order.
    #[must_use]
    pub fn domain_ids(&self, domain: &str) -> Vec<String> {
        self.lock()
            .domain
            .get(domain)
            .map(|ids| dedup_preserving(ids))
            .unwrap_or_default()
    }

    /// Ids for one category, deduplicated, insertion order.
    #[must_use]
    pub fn category_ids(&self, category: &str) -> Vec<String> {
        self.lock()
            .category
            .get(category)
            .map(|ids| dedup_preserving(ids))
            .unwrap_or_default()
    }

    /// Ids for one agent, deduplicated, insertion order.
    #[must_use]
    pub fn agent_ids(&self, agent: &str) -> Vec<String> {
        self.lock()
            .agent
            .get(agent)
            .map(|ids| dedup_preserving(ids))
            .unwrap_or_default()
    }

    /// Union of ids in every quality bucket overlapping [min, max].
    /// Bucket membership is approximate at the boundary; callers re-filter
    /// against exact scores in the durable store.
    #[must_use]
    pub fn quality_range_ids(&self, min_quality: f64, max_quality: f64) -> Vec<String> {
        let lo = quality_bucket(min_quality);
        let hi = quality_bucket(max_quality);
        let inner = self.lock();
        let mut ids = Vec::new();
        for bucket in lo..=hi {
            if let Some(bucket_ids) = inner.quality.get(&bucket) {
                ids.extend_from_slice(bucket_ids);
            }
        }
        drop(inner);
        dedup_preserving(&ids)
    }

    /// Newest-first id list, deduplicated. Enforces relative order only;
    /// exact timestamps must be re-verified against the durable store.
    #[must_use]
    pub fn recent_ids(&self) -> Vec<String> {
        dedup_preserving(&self.lock().recency)
    }

    /// Replace the whole index with entries scanned from the durable
    /// store in ascending timestamp order (so the rebuilt lists match
    /// what incremental appends would have produced).
    pub fn rebuild_from(&self, entries: Vec<IndexEntry>) {
        let mut rebuilt = IndexInner::default();
        for entry in &entries {
            rebuilt.insert(entry);
        }
        *self.lock() = rebuilt;
        tracing::info!(entries = entries.len(), "Secondary index rebuilt");
    }

    #[must_use]
    pub fn stats(&self) -> IndexStats {
        let inner = self.lock();
        IndexStats {
            domains: inner.domain.len() as u64,
            categories: inner.category.len() as u64,
            agents: inner.agent.len() as u64,
            quality_buckets: inner.quality.len() as u64,
            recency_len: inner.recency.len() as u64,
        }
    }
}

impl Default for SecondaryIndex {
    fn default() -> Self {
        Self::new()
    }
}
