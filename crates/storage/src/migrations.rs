//! Database migrations

use rusqlite::Connection;

use crate::error::{InsightError, Result};

pub const SCHEMA_VERSION: i32 = 1;

pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| InsightError::Migration(e.to_string()))?;

    tracing::info!(
        "Database schema version: {} (target: {})",
        current_version,
        SCHEMA_VERSION
    );

    if current_version < 1 {
        tracing::info!("Running migration v1: initial schema");
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS insights (
                id TEXT PRIMARY KEY,
                domain TEXT NOT NULL,
                category TEXT,
                agent_name TEXT,
                insight_type TEXT,
                quality_score REAL NOT NULL DEFAULT 0.0,
                engagement_score REAL NOT NULL DEFAULT 0.0,
                timestamp INTEGER NOT NULL,
                payload BLOB NOT NULL,
                compressed INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS engagement_metrics (
                insight_id TEXT PRIMARY KEY REFERENCES insights(id),
                click_rate REAL,
                retention_time REAL,
                share_rate REAL,
                requery_rate REAL,
                total_impressions INTEGER,
                last_updated INTEGER
            );

            CREATE TABLE IF NOT EXISTS agent_performance (
                agent_name TEXT PRIMARY KEY,
                total_insights INTEGER NOT NULL DEFAULT 0,
                avg_quality REAL NOT NULL DEFAULT 0.0,
                avg_engagement REAL NOT NULL DEFAULT 0.0,
                last_active INTEGER,
                status TEXT NOT NULL DEFAULT 'active'
            );

            CREATE INDEX IF NOT EXISTS idx_insights_domain ON insights(domain);
            CREATE INDEX IF NOT EXISTS idx_insights_category ON insights(category);
            CREATE INDEX IF NOT EXISTS idx_insights_agent ON insights(agent_name);
            CREATE INDEX IF NOT EXISTS idx_insights_quality ON insights(quality_score);
            CREATE INDEX IF NOT EXISTS idx_insights_timestamp ON insights(timestamp);

            CREATE INDEX IF NOT EXISTS idx_insights_domain_time ON insights(domain, timestamp);
            CREATE INDEX IF NOT EXISTS idx_insights_category_quality ON insights(category, quality_score);
            CREATE INDEX IF NOT EXISTS idx_insights_agent_quality ON insights(agent_name, quality_score);
            CREATE INDEX IF NOT EXISTS idx_insights_domain_quality_time ON insights(domain, quality_score, timestamp);
            CREATE INDEX IF NOT EXISTS idx_insights_category_engagement ON insights(category, engagement_score);

            CREATE INDEX IF NOT EXISTS idx_agent_perf_quality ON agent_performance(avg_quality);
            CREATE INDEX IF NOT EXISTS idx_agent_perf_active ON agent_performance(last_active);
            "#,
        )
        .map_err(|e| InsightError::Migration(e.to_string()))?;
    }

    conn.pragma_update(None, "user_version", SCHEMA_VERSION)
        .map_err(|e| InsightError::Migration(e.to_string()))?;
    tracing::info!("Database schema up to date (version {})", SCHEMA_VERSION);

    Ok(())
}
