//! Maintenance: database optimization and secondary-index rebuilds.
//!
//! Both operations run exclusively — a second caller gets
//! `MaintenanceBusy` immediately instead of queueing. Concurrent writes
//! during maintenance stay correct, only slower.

use std::sync::atomic::Ordering;

use super::{InsightStore, get_conn, log_row_error};
use crate::error::{InsightError, Result};
use crate::index::IndexEntry;

impl InsightStore {
    /// Reclaim space and refresh query-planner statistics (ANALYZE,
    /// VACUUM, `PRAGMA optimize`), then rebuild the secondary index.
    /// Run on demand, never automatically.
    ///
    /// # Errors
    /// `MaintenanceBusy` if another maintenance pass is running.
    pub fn optimize_database(&self) -> Result<()> {
        self.begin_maintenance()?;
        let result = self.optimize_inner();
        self.maintenance.store(false, Ordering::SeqCst);
        result
    }

    /// Clear and repopulate every index list from the durable store.
    /// Used after maintenance or on detected drift.
    ///
    /// # Errors
    /// `MaintenanceBusy` if another maintenance pass is running.
    pub fn rebuild_index(&self) -> Result<()> {
        self.begin_maintenance()?;
        let result = self.rebuild_index_inner();
        self.maintenance.store(false, Ordering::SeqCst);
        result
    }

    fn begin_maintenance(&self) -> Result<()> {
        self.maintenance
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| InsightError::MaintenanceBusy)?;
        Ok(())
    }

    fn optimize_inner(&self) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        conn.execute_batch("ANALYZE;")?;
        // VACUUM cannot run inside a transaction or batch.
        conn.execute("VACUUM", [])?;
        conn.execute_batch("PRAGMA optimize;")?;
        drop(conn);

        self.rebuild_index_inner()?;
        tracing::info!("Database optimization completed");
        Ok(())
    }

    /// Scan the indexed columns (never the payload blob) oldest-first so
    /// the rebuilt lists match incremental insertion order, then swap the
    /// whole index in one lock acquisition. The cache is dropped wholesale
    /// since rebuilt lists may order results differently.
    pub(crate) fn rebuild_index_inner(&self) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        let mut stmt = conn.prepare(
            "SELECT id, domain, category, agent_name, quality_score
             FROM insights ORDER BY timestamp ASC",
        )?;
        let entries: Vec<IndexEntry> = stmt
            .query_map([], |row| {
                Ok(IndexEntry {
                    id: row.get(0)?,
                    domain: row.get(1)?,
                    category: row.get(2)?,
                    agent_name: row.get(3)?,
                    quality_score: row.get(4)?,
                })
            })?
            .filter_map(log_row_error)
            .collect();
        drop(stmt);
        drop(conn);

        self.index.rebuild_from(entries);
        self.cache.clear();
        Ok(())
    }
}
