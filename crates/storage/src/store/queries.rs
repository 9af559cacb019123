//! The four hot-path queries plus dynamic-predicate search.
//!
//! Every entry point checks the query cache first and populates it after
//! hydration. The secondary index narrows candidates where it can; the
//! durable store performs exact filtering and ordering.

use std::collections::HashMap;

use chrono::Utc;
use insight_store_core::{Insight, SearchFilters};

use super::{
    BATCH_SIZE, InsightStore, coerce_to_sql, escape_like_pattern, get_conn, log_row_error,
    placeholders,
};
use crate::cache::CacheKey;
use crate::error::Result;

/// Restore a caller-chosen ranking after batch hydration, which always
/// returns rows timestamp-descending.
fn restore_order(insights: &mut [Insight], ids: &[String]) {
    let rank: HashMap<&str, usize> = ids
        .iter()
        .enumerate()
        .map(|(pos, id)| (id.as_str(), pos))
        .collect();
    insights.sort_by_key(|insight| rank.get(insight.id.as_str()).copied().unwrap_or(usize::MAX));
}

impl InsightStore {
    /// Insights for one domain, newest first, engagement metrics joined.
    ///
    /// # Errors
    /// Returns error if the database query fails.
    pub fn insights_by_domain(&self, domain: &str, limit: usize) -> Result<Vec<Insight>> {
        let key = CacheKey::new(
            "domain",
            &[("domain", domain.to_owned()), ("limit", limit.to_string())],
        );
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let mut ids = self.index.domain_ids(domain);
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        ids.truncate(limit);

        let insights = self.fetch_insights_batch(&ids, true)?;
        self.cache.insert(&key, insights.clone());
        Ok(insights)
    }

    /// Insights with `min_quality <= quality_score <= max_quality`,
    /// ordered quality then recency, both descending.
    ///
    /// The quality buckets only narrow the candidate set — membership is
    /// approximate at the bucket boundary, so exact scores are re-checked
    /// in the durable store.
    ///
    /// # Errors
    /// Returns error if the database query fails.
    pub fn insights_by_quality_range(
        &self,
        min_quality: f64,
        max_quality: f64,
        limit: usize,
    ) -> Result<Vec<Insight>> {
        let key = CacheKey::new(
            "quality_range",
            &[
                ("min_q", min_quality.to_string()),
                ("max_q", max_quality.to_string()),
                ("limit", limit.to_string()),
            ],
        );
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let candidates = self.index.quality_range_ids(min_quality, max_quality);
        let mut matches: Vec<(String, f64, i64)> = Vec::new();

        let conn = get_conn(&self.pool)?;
        for chunk in candidates.chunks(BATCH_SIZE) {
            let marks = placeholders(chunk.len());
            let sql = format!(
                "SELECT id, quality_score, timestamp FROM insights
                 WHERE id IN ({marks}) AND quality_score BETWEEN ? AND ?"
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut sql_params: Vec<&dyn rusqlite::ToSql> =
                chunk.iter().map(coerce_to_sql).collect();
            sql_params.push(&min_quality);
            sql_params.push(&max_quality);
            let rows = stmt
                .query_map(sql_params.as_slice(), |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                })?
                .filter_map(log_row_error);
            matches.extend(rows);
        }
        drop(conn);

        matches.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.2.cmp(&a.2))
        });
        matches.truncate(limit);
        let ids: Vec<String> = matches.into_iter().map(|(id, _, _)| id).collect();

        let mut insights = self.fetch_insights_batch(&ids, true)?;
        restore_order(&mut insights, &ids);
        self.cache.insert(&key, insights.clone());
        Ok(insights)
    }

    /// Insights written within the last `hours` hours, newest first.
    ///
    /// Walks the recency-ordered index list and stops once `limit`
    /// matches are found or the list is exhausted. The list enforces only
    /// relative order, so each candidate's exact timestamp is re-verified
    /// against the durable store.
    ///
    /// # Errors
    /// Returns error if the database query fails.
    pub fn recent_insights(&self, hours: i64, limit: usize) -> Result<Vec<Insight>> {
        let key = CacheKey::new(
            "recent",
            &[("hours", hours.to_string()), ("limit", limit.to_string())],
        );
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let cutoff = Utc::now().timestamp() - hours * 3600;
        let recency = self.index.recent_ids();
        let mut recent_ids: Vec<String> = Vec::new();

        let conn = get_conn(&self.pool)?;
        for chunk in recency.chunks(BATCH_SIZE) {
            if recent_ids.len() >= limit {
                break;
            }
            let marks = placeholders(chunk.len());
            let sql = format!("SELECT id, timestamp FROM insights WHERE id IN ({marks})");
            let mut stmt = conn.prepare(&sql)?;
            let sql_params: Vec<&dyn rusqlite::ToSql> =
                chunk.iter().map(coerce_to_sql).collect();
            let timestamps: HashMap<String, i64> = stmt
                .query_map(sql_params.as_slice(), |row| Ok((row.get(0)?, row.get(1)?)))?
                .filter_map(log_row_error)
                .collect();

            for id in chunk {
                if recent_ids.len() >= limit {
                    break;
                }
                if timestamps.get(id).is_some_and(|ts| *ts >= cutoff) {
                    recent_ids.push(id.clone());
                }
            }
        }
        drop(conn);

        let insights = self.fetch_insights_batch(&recent_ids, true)?;
        self.cache.insert(&key, insights.clone());
        Ok(insights)
    }

    /// Insights produced by one agent, with the agent's current
    /// performance rollup attached to every result.
    ///
    /// # Errors
    /// Returns error if the database query fails.
    pub fn agent_insights(&self, agent_name: &str, limit: usize) -> Result<Vec<Insight>> {
        let key = CacheKey::new(
            "agent",
            &[
                ("agent", agent_name.to_owned()),
                ("limit", limit.to_string()),
            ],
        );
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let mut ids = self.index.agent_ids(agent_name);
        ids.truncate(limit);
        let mut insights = self.fetch_insights_batch(&ids, true)?;

        if let Some(performance) = self.get_agent_performance(agent_name)? {
            for insight in &mut insights {
                insight.agent_performance = Some(performance.clone());
            }
        }

        self.cache.insert(&key, insights.clone());
        Ok(insights)
    }

    /// Dynamic-predicate search: `text` substring-matches against domain,
    /// category and insight type; `filters` add exact and range
    /// predicates. No index shortcut — this goes straight to the durable
    /// store, ordered quality then recency, both descending.
    ///
    /// # Errors
    /// Returns error if the database query fails.
    pub fn search_insights(
        &self,
        text: &str,
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<Vec<Insight>> {
        let mut key_params: Vec<(&str, String)> =
            vec![("text", text.to_owned()), ("limit", limit.to_string())];
        if let Some(domain) = &filters.domain {
            key_params.push(("domain", domain.clone()));
        }
        if let Some(category) = &filters.category {
            key_params.push(("category", category.clone()));
        }
        if let Some(agent) = &filters.agent {
            key_params.push(("agent", agent.clone()));
        }
        if let Some(min_quality) = filters.min_quality {
            key_params.push(("min_q", min_quality.to_string()));
        }
        if let Some(max_quality) = filters.max_quality {
            key_params.push(("max_q", max_quality.to_string()));
        }
        if let Some(since) = filters.since {
            key_params.push(("since", since.to_string()));
        }
        let key = CacheKey::new("search", &key_params);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let mut conditions: Vec<String> = Vec::new();
        let mut sql_params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if !text.is_empty() {
            let pattern = format!("%{}%", escape_like_pattern(text));
            conditions.push(
                "(domain LIKE ? ESCAPE '\\' OR category LIKE ? ESCAPE '\\' OR insight_type LIKE ? ESCAPE '\\')"
                    .to_owned(),
            );
            sql_params.push(Box::new(pattern.clone()));
            sql_params.push(Box::new(pattern.clone()));
            sql_params.push(Box::new(pattern));
        }
        if let Some(domain) = &filters.domain {
            conditions.push("domain = ?".to_owned());
            sql_params.push(Box::new(domain.clone()));
        }
        if let Some(category) = &filters.category {
            conditions.push("category = ?".to_owned());
            sql_params.push(Box::new(category.clone()));
        }
        if let Some(agent) = &filters.agent {
            conditions.push("agent_name = ?".to_owned());
            sql_params.push(Box::new(agent.clone()));
        }
        if let Some(min_quality) = filters.min_quality {
            conditions.push("quality_score >= ?".to_owned());
            sql_params.push(Box::new(min_quality));
        }
        if let Some(max_quality) = filters.max_quality {
            conditions.push("quality_score <= ?".to_owned());
            sql_params.push(Box::new(max_quality));
        }
        if let Some(since) = filters.since {
            conditions.push("timestamp >= ?".to_owned());
            sql_params.push(Box::new(since));
        }

        let where_clause = if conditions.is_empty() {
            "1=1".to_owned()
        } else {
            conditions.join(" AND ")
        };
        let sql = format!(
            "SELECT id FROM insights WHERE {where_clause}
             ORDER BY quality_score DESC, timestamp DESC LIMIT ?"
        );

        let conn = get_conn(&self.pool)?;
        let mut stmt = conn.prepare(&sql)?;
        let limit_param = limit as i64;
        let mut all_params: Vec<&dyn rusqlite::ToSql> =
            sql_params.iter().map(AsRef::as_ref).collect();
        all_params.push(coerce_to_sql(&limit_param));

        let ids: Vec<String> = stmt
            .query_map(all_params.as_slice(), |row| row.get(0))?
            .filter_map(log_row_error)
            .collect();
        drop(stmt);
        drop(conn);

        let mut insights = self.fetch_insights_batch(&ids, true)?;
        restore_order(&mut insights, &ids);
        self.cache.insert(&key, insights.clone());
        Ok(insights)
    }
}
