use serde::{Deserialize, Serialize};

/// Aggregate operational report over the store, its cache and its indexes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceReport {
    /// Total insights in the durable store.
    pub total_insights: u64,
    /// Total agents with a performance rollup.
    pub total_agents: u64,
    /// Insights written in the last 24 hours.
    pub recent_insights_24h: u64,
    /// Counts per quality band.
    pub quality_distribution: QualityDistribution,
    /// Top 10 agents by average quality, then volume.
    pub top_agents: Vec<TopAgent>,
    /// Live query-cache introspection.
    pub cache: CacheStats,
    /// Live secondary-index introspection.
    pub index: IndexStats,
}

/// Quality-band histogram: excellent >= 0.9, good >= 0.7, fair >= 0.5,
/// poor otherwise.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct QualityDistribution {
    pub excellent: u64,
    pub good: u64,
    pub fair: u64,
    pub poor: u64,
}

/// One row of the top-agent leaderboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopAgent {
    pub agent_name: String,
    pub total_insights: i64,
    pub avg_quality: f64,
    pub avg_engagement: f64,
}

/// Snapshot of query-cache counters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CacheStats {
    /// Live (non-expired at last access) entries.
    pub entries: u64,
    pub hits: u64,
    pub misses: u64,
    /// hits / (hits + misses); 0.0 before any lookup.
    pub hit_rate: f64,
}

/// Snapshot of secondary-index map sizes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IndexStats {
    /// Distinct domains indexed.
    pub domains: u64,
    /// Distinct categories indexed.
    pub categories: u64,
    /// Distinct agents indexed.
    pub agents: u64,
    /// Quality buckets in use.
    pub quality_buckets: u64,
    /// Length of the recency-ordered id list.
    pub recency_len: u64,
}
