//! Batch hydration: ids -> fully formed [`Insight`] values.

use std::collections::HashSet;

use insight_store_core::{EngagementMetrics, Insight};

use super::{BATCH_SIZE, InsightStore, coerce_to_sql, get_conn, log_row_error, placeholders};
use crate::codec::decode_payload;
use crate::error::Result;

/// One insight row before payload decoding.
struct RawRow {
    id: String,
    domain: String,
    category: Option<String>,
    agent_name: Option<String>,
    insight_type: Option<String>,
    quality_score: f64,
    engagement_score: f64,
    timestamp: i64,
    payload: Vec<u8>,
    compressed: bool,
    engagement: Option<EngagementMetrics>,
}

fn map_raw_row(row: &rusqlite::Row<'_>, with_engagement: bool) -> rusqlite::Result<RawRow> {
    let engagement = if with_engagement {
        // The join marker column is the joined table's key; NULL means the
        // insight has no recorded metrics.
        let matched: Option<String> = row.get(10)?;
        matched
            .map(|_| -> rusqlite::Result<EngagementMetrics> {
                Ok(EngagementMetrics {
                    click_rate: row.get::<_, Option<f64>>(11)?.unwrap_or_default(),
                    retention_time: row.get::<_, Option<f64>>(12)?.unwrap_or_default(),
                    share_rate: row.get::<_, Option<f64>>(13)?.unwrap_or_default(),
                    requery_rate: row.get::<_, Option<f64>>(14)?.unwrap_or_default(),
                    total_impressions: row.get::<_, Option<i64>>(15)?.unwrap_or_default(),
                })
            })
            .transpose()?
    } else {
        None
    };

    Ok(RawRow {
        id: row.get(0)?,
        domain: row.get(1)?,
        category: row.get(2)?,
        agent_name: row.get(3)?,
        insight_type: row.get(4)?,
        quality_score: row.get(5)?,
        engagement_score: row.get(6)?,
        timestamp: row.get(7)?,
        payload: row.get(8)?,
        compressed: row.get(9)?,
        engagement,
    })
}

impl InsightStore {
    /// Fetch and decode a batch of insights in one durable-store round
    /// trip per [`BATCH_SIZE`] chunk, optionally joining engagement
    /// metrics. Results come back timestamp-descending regardless of the
    /// input order; an empty id list never touches the database.
    ///
    /// A row whose payload fails to decode is logged and skipped — one
    /// corrupt record does not abort the batch. The typed columns are the
    /// source of truth for indexed fields; the decoded payload rides along
    /// as-is.
    ///
    /// # Errors
    /// Returns error if the database query fails.
    pub fn fetch_insights_batch(
        &self,
        ids: &[String],
        include_engagement: bool,
    ) -> Result<Vec<Insight>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut seen = HashSet::new();
        let unique: Vec<&String> = ids.iter().filter(|id| seen.insert(id.as_str())).collect();

        let conn = get_conn(&self.pool)?;
        let mut raw_rows: Vec<RawRow> = Vec::with_capacity(unique.len());

        for chunk in unique.chunks(BATCH_SIZE) {
            let marks = placeholders(chunk.len());
            let sql = if include_engagement {
                format!(
                    r#"SELECT i.id, i.domain, i.category, i.agent_name, i.insight_type,
                              i.quality_score, i.engagement_score, i.timestamp, i.payload, i.compressed,
                              e.insight_id, e.click_rate, e.retention_time, e.share_rate, e.requery_rate, e.total_impressions
                       FROM insights i
                       LEFT JOIN engagement_metrics e ON i.id = e.insight_id
                       WHERE i.id IN ({marks})"#
                )
            } else {
                format!(
                    r#"SELECT id, domain, category, agent_name, insight_type,
                              quality_score, engagement_score, timestamp, payload, compressed
                       FROM insights WHERE id IN ({marks})"#
                )
            };

            let mut stmt = conn.prepare(&sql)?;
            let sql_params: Vec<&dyn rusqlite::ToSql> =
                chunk.iter().map(coerce_to_sql).collect();
            let rows = stmt
                .query_map(sql_params.as_slice(), |row| {
                    map_raw_row(row, include_engagement)
                })?
                .filter_map(log_row_error);
            raw_rows.extend(rows);
        }
        drop(conn);

        let mut insights: Vec<Insight> = raw_rows
            .into_iter()
            .filter_map(|raw| match decode_payload(&raw.payload, raw.compressed, &raw.id) {
                Ok(payload) => Some(Insight {
                    id: raw.id,
                    domain: raw.domain,
                    category: raw.category,
                    agent_name: raw.agent_name,
                    insight_type: raw.insight_type,
                    quality_score: raw.quality_score,
                    engagement_score: raw.engagement_score,
                    timestamp: raw.timestamp,
                    payload,
                    engagement: raw.engagement,
                    agent_performance: None,
                }),
                Err(e) => {
                    tracing::warn!("Skipping corrupt insight row: {}", e);
                    None
                },
            })
            .collect();

        insights.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(insights)
    }
}
