use chrono::Utc;
use insight_store_core::{EngagementMetrics, NewInsight};
use serde_json::json;

use super::{create_test_store, test_insight};
use crate::COMPRESSION_THRESHOLD;

#[test]
fn test_store_new_is_empty() {
    let (store, _temp_dir) = create_test_store();
    let report = store.get_performance_stats().unwrap();
    assert_eq!(report.total_insights, 0);
    assert_eq!(report.total_agents, 0);
}

#[test]
fn test_store_and_retrieve_insight() {
    let (store, _temp_dir) = create_test_store();
    let now = Utc::now().timestamp();

    let id = store.store_insight(&test_insight("a1", "x.com", 0.92, now)).unwrap();
    assert_eq!(id, "a1");

    let results = store.insights_by_domain("x.com", 5).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "a1");
    assert!((results[0].quality_score - 0.92).abs() < f64::EPSILON);
    assert_eq!(results[0].payload, json!({ "content": "insight a1" }));
}

#[test]
fn test_id_generated_when_absent() {
    let (store, _temp_dir) = create_test_store();
    let mut insight = test_insight("ignored", "x.com", 0.5, Utc::now().timestamp());
    insight.id = None;

    let id = store.store_insight(&insight).unwrap();
    assert!(id.starts_with("insight_"));
}

#[test]
fn test_quality_scores_clamped_at_write() {
    let (store, _temp_dir) = create_test_store();
    let now = Utc::now().timestamp();

    let mut high = test_insight("high", "x.com", 1.7, now);
    high.engagement_score = 2.5;
    store.store_insight(&high).unwrap();
    let mut low = test_insight("low", "y.com", -0.3, now);
    low.engagement_score = -1.0;
    store.store_insight(&low).unwrap();

    let results = store.insights_by_domain("x.com", 5).unwrap();
    assert!((results[0].quality_score - 1.0).abs() < f64::EPSILON);
    assert!((results[0].engagement_score - 1.0).abs() < f64::EPSILON);

    let results = store.insights_by_domain("y.com", 5).unwrap();
    assert!(results[0].quality_score.abs() < f64::EPSILON);
    assert!(results[0].engagement_score.abs() < f64::EPSILON);
}

#[test]
fn test_upsert_same_id_keeps_one_row() {
    let (store, _temp_dir) = create_test_store();
    let now = Utc::now().timestamp();

    store.store_insight(&test_insight("dup", "x.com", 0.3, now)).unwrap();
    let mut replacement = test_insight("dup", "x.com", 0.9, now + 1);
    replacement.payload = json!({ "content": "replaced" });
    store.store_insight(&replacement).unwrap();

    let report = store.get_performance_stats().unwrap();
    assert_eq!(report.total_insights, 1);

    // After a rebuild exactly one live index entry remains per list.
    store.rebuild_index().unwrap();
    assert_eq!(store.index.domain_ids("x.com").len(), 1);
    assert_eq!(store.index.stats().recency_len, 1);

    let results = store.insights_by_domain("x.com", 5).unwrap();
    assert_eq!(results.len(), 1);
    assert!((results[0].quality_score - 0.9).abs() < f64::EPSILON);
    assert_eq!(results[0].payload, json!({ "content": "replaced" }));
}

#[test]
fn test_compressed_payload_round_trips_through_store() {
    let (store, _temp_dir) = create_test_store();
    let big = json!({ "content": "y".repeat(COMPRESSION_THRESHOLD * 4) });
    let mut insight = test_insight("big", "x.com", 0.8, Utc::now().timestamp());
    insight.payload = big.clone();

    store.store_insight(&insight).unwrap();

    let results = store.insights_by_domain("x.com", 5).unwrap();
    assert_eq!(results[0].payload, big);
}

#[test]
fn test_engagement_metrics_joined_when_recorded() {
    let (store, _temp_dir) = create_test_store();
    let now = Utc::now().timestamp();
    store.store_insight(&test_insight("a1", "x.com", 0.8, now)).unwrap();
    store.store_insight(&test_insight("a2", "x.com", 0.8, now)).unwrap();

    let metrics = EngagementMetrics {
        click_rate: 0.31,
        retention_time: 42.0,
        share_rate: 0.05,
        requery_rate: 0.12,
        total_impressions: 900,
    };
    store.record_engagement("a1", &metrics).unwrap();

    let results = store.insights_by_domain("x.com", 5).unwrap();
    let a1 = results.iter().find(|i| i.id == "a1").unwrap();
    let a2 = results.iter().find(|i| i.id == "a2").unwrap();
    assert_eq!(a1.engagement, Some(metrics));
    assert_eq!(a2.engagement, None, "absence of metrics is valid");
}

#[test]
fn test_agent_performance_ema() {
    let (store, _temp_dir) = create_test_store();
    let now = Utc::now().timestamp();

    let mut first = test_insight("a1", "x.com", 0.8, now);
    first.agent_name = Some("agent-ema".to_owned());
    first.engagement_score = 0.4;
    store.store_insight(&first).unwrap();

    let mut second = test_insight("a2", "x.com", 0.6, now + 1);
    second.agent_name = Some("agent-ema".to_owned());
    second.engagement_score = 0.2;
    store.store_insight(&second).unwrap();

    let perf = store.get_agent_performance("agent-ema").unwrap().unwrap();
    assert_eq!(perf.total_insights, 2);
    assert!((perf.avg_quality - (0.8 * 0.9 + 0.6 * 0.1)).abs() < 1e-9);
    assert!((perf.avg_engagement - (0.4 * 0.9 + 0.2 * 0.1)).abs() < 1e-9);
    assert_eq!(perf.last_active, now + 1);
}

#[test]
fn test_unknown_agent_has_no_performance() {
    let (store, _temp_dir) = create_test_store();
    assert!(store.get_agent_performance("nobody").unwrap().is_none());
}

#[test]
fn test_insight_without_agent_skips_rollup() {
    let (store, _temp_dir) = create_test_store();
    let mut insight = test_insight("a1", "x.com", 0.8, Utc::now().timestamp());
    insight.agent_name = None;
    store.store_insight(&insight).unwrap();

    let report = store.get_performance_stats().unwrap();
    assert_eq!(report.total_insights, 1);
    assert_eq!(report.total_agents, 0);
}

#[test]
fn test_hydrator_empty_input_short_circuits() {
    let (store, _temp_dir) = create_test_store();
    let results = store.fetch_insights_batch(&[], true).unwrap();
    assert!(results.is_empty());
}

#[test]
fn test_corrupt_row_does_not_abort_batch() {
    let (store, _temp_dir) = create_test_store();
    let now = Utc::now().timestamp();
    store.store_insight(&test_insight("good", "x.com", 0.8, now)).unwrap();
    store.store_insight(&test_insight("bad", "x.com", 0.8, now + 1)).unwrap();

    // Corrupt one payload behind the codec's back.
    let conn = store.pool.get().unwrap();
    conn.execute(
        "UPDATE insights SET payload = X'00FF1337', compressed = 0 WHERE id = 'bad'",
        [],
    )
    .unwrap();
    drop(conn);

    let ids = vec!["good".to_owned(), "bad".to_owned()];
    let results = store.fetch_insights_batch(&ids, true).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "good");
}

#[test]
fn test_store_insight_defaults_timestamp_to_now() {
    let (store, _temp_dir) = create_test_store();
    let before = Utc::now().timestamp();
    let insight = NewInsight::new("x.com", 0.7, json!({ "content": "now" }));
    store.store_insight(&insight).unwrap();

    let results = store.insights_by_domain("x.com", 5).unwrap();
    assert!(results[0].timestamp >= before);
}
