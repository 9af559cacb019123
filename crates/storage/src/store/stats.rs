use chrono::Utc;
use insight_store_core::{PerformanceReport, QualityDistribution, TopAgent};
use rusqlite::params;

use super::{InsightStore, get_conn, log_row_error};
use crate::error::Result;

impl InsightStore {
    /// Aggregate operational report: store counts, quality-band histogram,
    /// 24-hour activity, top agents, plus live cache and index statistics.
    /// Read-only.
    ///
    /// # Errors
    /// Returns error if a database query fails.
    pub fn get_performance_stats(&self) -> Result<PerformanceReport> {
        let conn = get_conn(&self.pool)?;

        let total_insights: i64 =
            conn.query_row("SELECT COUNT(*) FROM insights", [], |row| row.get(0))?;
        let total_agents: i64 =
            conn.query_row("SELECT COUNT(*) FROM agent_performance", [], |row| row.get(0))?;

        let day_ago = Utc::now().timestamp() - 86_400;
        let recent_insights_24h: i64 = conn.query_row(
            "SELECT COUNT(*) FROM insights WHERE timestamp >= ?1",
            params![day_ago],
            |row| row.get(0),
        )?;

        let mut quality_distribution = QualityDistribution::default();
        let mut stmt = conn.prepare(
            r#"SELECT
                   CASE
                       WHEN quality_score >= 0.9 THEN 'excellent'
                       WHEN quality_score >= 0.7 THEN 'good'
                       WHEN quality_score >= 0.5 THEN 'fair'
                       ELSE 'poor'
                   END AS quality_band,
                   COUNT(*) AS count
               FROM insights
               GROUP BY quality_band"#,
        )?;
        let bands = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .filter_map(log_row_error);
        for (band, count) in bands {
            let count = count as u64;
            match band.as_str() {
                "excellent" => quality_distribution.excellent = count,
                "good" => quality_distribution.good = count,
                "fair" => quality_distribution.fair = count,
                _ => quality_distribution.poor = count,
            }
        }
        drop(stmt);

        let mut stmt = conn.prepare(
            r#"SELECT agent_name, total_insights, avg_quality, avg_engagement
               FROM agent_performance
               ORDER BY avg_quality DESC, total_insights DESC
               LIMIT 10"#,
        )?;
        let top_agents: Vec<TopAgent> = stmt
            .query_map([], |row| {
                Ok(TopAgent {
                    agent_name: row.get(0)?,
                    total_insights: row.get(1)?,
                    avg_quality: row.get(2)?,
                    avg_engagement: row.get(3)?,
                })
            })?
            .filter_map(log_row_error)
            .collect();
        drop(stmt);

        Ok(PerformanceReport {
            total_insights: total_insights as u64,
            total_agents: total_agents as u64,
            recent_insights_24h: recent_insights_24h as u64,
            quality_distribution,
            top_agents,
            cache: self.cache.stats(),
            index: self.index.stats(),
        })
    }
}
