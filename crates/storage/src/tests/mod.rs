//! Test utilities and module declarations for storage tests.

use insight_store_core::NewInsight;
use serde_json::json;
use tempfile::TempDir;

use crate::InsightStore;

mod query_tests;
mod store_tests;

pub fn create_test_store() -> (InsightStore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let store = InsightStore::new(&db_path).unwrap();
    (store, temp_dir)
}

pub fn test_insight(id: &str, domain: &str, quality: f64, timestamp: i64) -> NewInsight {
    NewInsight {
        id: Some(id.to_owned()),
        domain: domain.to_owned(),
        category: Some("tech".to_owned()),
        agent_name: Some("agent-alpha".to_owned()),
        insight_type: Some("comparative".to_owned()),
        quality_score: quality,
        engagement_score: 0.5,
        timestamp: Some(timestamp),
        payload: json!({ "content": format!("insight {id}") }),
    }
}
