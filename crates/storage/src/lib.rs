//! Storage layer for the insight store
//!
//! SQLite-backed durable store with in-process secondary indexes and a
//! TTL-bounded query cache. Writes flow codec -> durable store -> index
//! update -> cache invalidation; reads are served from the cache when
//! possible and hydrated in batches otherwise.

mod cache;
mod codec;
mod error;
mod index;
mod migrations;
mod store;
#[cfg(test)]
mod tests;

pub use cache::{CacheKey, QueryCache, cache_capacity, cache_ttl_secs};
pub use codec::{COMPRESSION_THRESHOLD, decode_payload, encode_payload};
pub use error::{InsightError, Result};
pub use index::{IndexEntry, MAX_RECENCY_IDS, SecondaryIndex, quality_bucket};
pub use store::InsightStore;
