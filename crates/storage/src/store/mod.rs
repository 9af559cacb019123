//! `SQLite`-backed insight store.
//!
//! One `InsightStore` handle wraps a connection pool, the in-process
//! secondary index and the query cache. Handles are cheap to clone and
//! meant to be passed explicitly to every collaborator at startup — there
//! is no process-wide singleton.
//!
//! Writes are sequenced durable store -> index update -> cache
//! invalidation. The steps are individually safe but not wrapped in one
//! cross-component transaction, so readers racing a writer may briefly
//! observe the previous index or cache state.

// SQLite uses i64 for counts/limits, Rust uses usize - safe conversions within DB context
#![allow(
    clippy::as_conversions,
    clippy::cast_possible_wrap,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    reason = "SQLite i64 <-> Rust usize conversions are safe within DB row counts"
)]

mod hydrate;
mod insights;
mod maintenance;
mod queries;
mod stats;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::cache::QueryCache;
use crate::error::{InsightError, Result};
use crate::index::SecondaryIndex;
use crate::migrations;

/// Type alias for pooled connection
pub(crate) type PooledConn = PooledConnection<SqliteConnectionManager>;

/// Chunk size for `IN (...)` expansions, below SQLite's host-parameter cap.
pub(crate) const BATCH_SIZE: usize = 500;

/// Handle to one insight store. Clones share the pool, index and cache.
#[derive(Clone)]
pub struct InsightStore {
    pub(crate) pool: Pool<SqliteConnectionManager>,
    pub(crate) index: Arc<SecondaryIndex>,
    pub(crate) cache: Arc<QueryCache>,
    pub(crate) maintenance: Arc<AtomicBool>,
}

/// Get a connection from the pool
pub(crate) fn get_conn(pool: &Pool<SqliteConnectionManager>) -> Result<PooledConn> {
    pool.get()
        .map_err(|e| InsightError::Database(format!("failed to get connection from pool: {e}")))
}

/// Log row read errors and filter them out
pub(crate) fn log_row_error<T>(result: rusqlite::Result<T>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!("Row read error: {}", e);
            None
        },
    }
}

/// Escape special characters for LIKE pattern matching
pub(crate) fn escape_like_pattern(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

/// Coerce a reference to `ToSql` trait object (avoids trivial cast lint)
pub(crate) fn coerce_to_sql<T: rusqlite::ToSql>(val: &T) -> &dyn rusqlite::ToSql {
    val
}

/// Repeat `?` placeholders for an `IN` clause over `n` values.
pub(crate) fn placeholders(n: usize) -> String {
    let mut out = String::with_capacity(n * 2);
    for i in 0..n {
        if i > 0 {
            out.push(',');
        }
        out.push('?');
    }
    out
}

/// Connection initializer: WAL journal and a generous busy timeout so
/// concurrent writers queue instead of failing.
fn init_connection(conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
    conn.execute_batch(
        "PRAGMA busy_timeout = 30000;
         PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;",
    )?;
    Ok(())
}

fn db_pool_size() -> u32 {
    std::env::var("INSIGHT_STORE_DB_POOL_SIZE")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8)
}

impl InsightStore {
    /// Open (or create) the store at `db_path`: run migrations, build the
    /// secondary index from the durable store, start with a cold cache.
    pub fn new(db_path: &Path) -> Result<Self> {
        let manager = SqliteConnectionManager::file(db_path).with_init(init_connection);

        let pool_size = db_pool_size();
        let pool = Pool::builder().max_size(pool_size).build(manager)?;

        let conn = pool.get()?;
        migrations::run_migrations(&conn)?;
        drop(conn);

        let store = Self {
            pool,
            index: Arc::new(SecondaryIndex::new()),
            cache: Arc::new(QueryCache::new()),
            maintenance: Arc::new(AtomicBool::new(false)),
        };
        store.rebuild_index_inner()?;

        tracing::info!(pool_size = pool_size, "Insight store initialized");

        Ok(store)
    }
}
