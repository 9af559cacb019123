use chrono::Utc;
use insight_store_core::{AgentPerformance, AgentStatus, EngagementMetrics, NewInsight};
use rusqlite::{OptionalExtension as _, params};

use super::{InsightStore, get_conn};
use crate::codec::encode_payload;
use crate::error::Result;
use crate::index::IndexEntry;

/// Weight of the prior average in the per-agent EMA; the new sample
/// contributes the remainder.
const EMA_OLD_WEIGHT: f64 = 0.9;
const EMA_NEW_WEIGHT: f64 = 0.1;

impl InsightStore {
    /// Store one insight, replacing any prior record with the same id.
    ///
    /// The insight row and the producing agent's rollup are written in one
    /// transaction; a failure rolls both back. On success the secondary
    /// index is appended to and cached queries touching the domain are
    /// invalidated. Returns the effective id.
    ///
    /// # Errors
    /// `WriteConflict` on a constraint violation, `Database` otherwise.
    pub fn store_insight(&self, insight: &NewInsight) -> Result<String> {
        let id = insight.effective_id();
        let timestamp = insight.effective_timestamp();
        let quality_score = insight.quality_score.clamp(0.0, 1.0);
        let engagement_score = insight.engagement_score.clamp(0.0, 1.0);
        let (payload, compressed) = encode_payload(&insight.payload)?;

        let mut conn = get_conn(&self.pool)?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"INSERT OR REPLACE INTO insights
               (id, domain, category, agent_name, insight_type, quality_score, engagement_score, timestamp, payload, compressed)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"#,
            params![
                id,
                insight.domain,
                insight.category,
                insight.agent_name,
                insight.insight_type,
                quality_score,
                engagement_score,
                timestamp,
                payload,
                compressed,
            ],
        )?;

        if let Some(agent) = &insight.agent_name {
            upsert_agent_performance(&tx, agent, quality_score, engagement_score, timestamp)?;
        }

        tx.commit()?;

        self.index.insert(&IndexEntry {
            id: id.clone(),
            domain: insight.domain.clone(),
            category: insight.category.clone(),
            agent_name: insight.agent_name.clone(),
            quality_score,
        });
        self.cache.invalidate_domain(&insight.domain);

        tracing::debug!(id = %id, domain = %insight.domain, compressed, "Stored insight");
        Ok(id)
    }

    /// Record engagement metrics for an insight. Independent of the
    /// insight write; replaces any prior metrics for the same id.
    ///
    /// # Errors
    /// Returns error if the database write fails.
    pub fn record_engagement(&self, insight_id: &str, metrics: &EngagementMetrics) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        conn.execute(
            r#"INSERT OR REPLACE INTO engagement_metrics
               (insight_id, click_rate, retention_time, share_rate, requery_rate, total_impressions, last_updated)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
            params![
                insight_id,
                metrics.click_rate,
                metrics.retention_time,
                metrics.share_rate,
                metrics.requery_rate,
                metrics.total_impressions,
                Utc::now().timestamp(),
            ],
        )?;

        // Cached results embed joined metrics, so stale domain entries go.
        let domain: Option<String> = conn
            .query_row(
                "SELECT domain FROM insights WHERE id = ?1",
                params![insight_id],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(domain) = domain {
            self.cache.invalidate_domain(&domain);
        }

        Ok(())
    }

    /// Current rollup for one agent, if it has ever written an insight.
    ///
    /// # Errors
    /// Returns error if the database query fails.
    pub fn get_agent_performance(&self, agent_name: &str) -> Result<Option<AgentPerformance>> {
        let conn = get_conn(&self.pool)?;
        let row = conn
            .query_row(
                r#"SELECT agent_name, total_insights, avg_quality, avg_engagement, last_active, status
                   FROM agent_performance WHERE agent_name = ?1"#,
                params![agent_name],
                |row| {
                    let status: String = row.get(5)?;
                    Ok(AgentPerformance {
                        agent_name: row.get(0)?,
                        total_insights: row.get(1)?,
                        avg_quality: row.get(2)?,
                        avg_engagement: row.get(3)?,
                        last_active: row.get::<_, Option<i64>>(4)?.unwrap_or_default(),
                        status: status.parse().unwrap_or(AgentStatus::Active),
                    })
                },
            )
            .optional()?;
        Ok(row)
    }
}

/// Upsert the per-agent rollup inside the caller's transaction: bump the
/// counter and blend the new scores into the moving averages.
fn upsert_agent_performance(
    tx: &rusqlite::Transaction<'_>,
    agent: &str,
    quality_score: f64,
    engagement_score: f64,
    timestamp: i64,
) -> Result<()> {
    let existing: Option<(i64, f64, f64)> = tx
        .query_row(
            "SELECT total_insights, avg_quality, avg_engagement FROM agent_performance WHERE agent_name = ?1",
            params![agent],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;

    match existing {
        Some((total_insights, avg_quality, avg_engagement)) => {
            tx.execute(
                r#"UPDATE agent_performance
                   SET total_insights = ?1, avg_quality = ?2, avg_engagement = ?3, last_active = ?4
                   WHERE agent_name = ?5"#,
                params![
                    total_insights + 1,
                    avg_quality * EMA_OLD_WEIGHT + quality_score * EMA_NEW_WEIGHT,
                    avg_engagement * EMA_OLD_WEIGHT + engagement_score * EMA_NEW_WEIGHT,
                    timestamp,
                    agent,
                ],
            )?;
        },
        None => {
            tx.execute(
                r#"INSERT INTO agent_performance
                   (agent_name, total_insights, avg_quality, avg_engagement, last_active, status)
                   VALUES (?1, 1, ?2, ?3, ?4, ?5)"#,
                params![
                    agent,
                    quality_score,
                    engagement_score,
                    timestamp,
                    AgentStatus::Active.as_str(),
                ],
            )?;
        },
    }
    Ok(())
}
