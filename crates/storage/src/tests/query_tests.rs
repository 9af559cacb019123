use chrono::Utc;
use insight_store_core::SearchFilters;

use super::{create_test_store, test_insight};

#[test]
fn test_by_domain_caps_at_limit() {
    let (store, _temp_dir) = create_test_store();
    let now = Utc::now().timestamp();
    for i in 0..10 {
        store
            .store_insight(&test_insight(&format!("a{i}"), "x.com", 0.8, now + i))
            .unwrap();
    }

    let results = store.insights_by_domain("x.com", 3).unwrap();
    assert_eq!(results.len(), 3);
}

#[test]
fn test_by_domain_unknown_is_empty_not_error() {
    let (store, _temp_dir) = create_test_store();
    let results = store.insights_by_domain("nowhere.example", 5).unwrap();
    assert!(results.is_empty());
}

#[test]
fn test_repeat_query_is_served_from_cache() {
    let (store, _temp_dir) = create_test_store();
    let now = Utc::now().timestamp();
    store.store_insight(&test_insight("a1", "x.com", 0.92, now)).unwrap();

    let first = store.insights_by_domain("x.com", 10).unwrap();
    let hits_before = store.cache.stats().hits;
    let second = store.insights_by_domain("x.com", 10).unwrap();

    assert_eq!(store.cache.stats().hits, hits_before + 1);
    assert_eq!(first.len(), second.len());
    assert_eq!(first[0].id, second[0].id);
}

#[test]
fn test_write_invalidates_domain_cache() {
    let (store, _temp_dir) = create_test_store();
    let now = Utc::now().timestamp();
    store.store_insight(&test_insight("a1", "x.com", 0.92, now)).unwrap();

    let first = store.insights_by_domain("x.com", 10).unwrap();
    assert_eq!(first.len(), 1);

    // A write for the same domain must force the next read past the
    // stale entry.
    store.store_insight(&test_insight("a2", "x.com", 0.40, now + 1)).unwrap();
    let second = store.insights_by_domain("x.com", 10).unwrap();
    assert_eq!(second.len(), 2);
}

#[test]
fn test_write_leaves_other_domains_cached() {
    let (store, _temp_dir) = create_test_store();
    let now = Utc::now().timestamp();
    store.store_insight(&test_insight("a1", "x.com", 0.9, now)).unwrap();
    store.store_insight(&test_insight("b1", "y.com", 0.9, now)).unwrap();

    store.insights_by_domain("y.com", 10).unwrap();
    let hits_before = store.cache.stats().hits;

    store.store_insight(&test_insight("a2", "x.com", 0.9, now + 1)).unwrap();
    store.insights_by_domain("y.com", 10).unwrap();
    assert_eq!(store.cache.stats().hits, hits_before + 1);
}

#[test]
fn test_quality_range_filters_and_orders() {
    let (store, _temp_dir) = create_test_store();
    let now = Utc::now().timestamp();
    store.store_insight(&test_insight("a1", "x.com", 0.92, now)).unwrap();
    store.store_insight(&test_insight("a2", "x.com", 0.40, now + 1)).unwrap();
    store.store_insight(&test_insight("a3", "x.com", 0.75, now + 2)).unwrap();

    let results = store.insights_by_quality_range(0.5, 1.0, 5).unwrap();
    let ids: Vec<&str> = results.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["a1", "a3"], "quality descending, low score excluded");
}

#[test]
fn test_quality_range_exact_boundary_refilter() {
    let (store, _temp_dir) = create_test_store();
    let now = Utc::now().timestamp();
    // Same 0.1-wide bucket, opposite sides of the requested boundary.
    store.store_insight(&test_insight("in", "x.com", 0.58, now)).unwrap();
    store.store_insight(&test_insight("out", "x.com", 0.52, now)).unwrap();

    let results = store.insights_by_quality_range(0.55, 1.0, 5).unwrap();
    let ids: Vec<&str> = results.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["in"]);
}

#[test]
fn test_recent_respects_cutoff_and_order() {
    let (store, _temp_dir) = create_test_store();
    let now = Utc::now().timestamp();
    store.store_insight(&test_insight("a1", "x.com", 0.92, now - 5)).unwrap();
    store.store_insight(&test_insight("a2", "x.com", 0.40, now - 4)).unwrap();
    store.store_insight(&test_insight("stale", "x.com", 0.9, now - 7 * 3600)).unwrap();

    let results = store.recent_insights(1, 5).unwrap();
    let ids: Vec<&str> = results.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["a2", "a1"], "newest first, old insight cut off");
}

#[test]
fn test_recent_stops_at_limit() {
    let (store, _temp_dir) = create_test_store();
    let now = Utc::now().timestamp();
    for i in 0..10 {
        store
            .store_insight(&test_insight(&format!("a{i}"), "x.com", 0.8, now - 10 + i))
            .unwrap();
    }

    let results = store.recent_insights(24, 4).unwrap();
    assert_eq!(results.len(), 4);
    assert_eq!(results[0].id, "a9");
}

#[test]
fn test_agent_insights_attach_performance() {
    let (store, _temp_dir) = create_test_store();
    let now = Utc::now().timestamp();
    store.store_insight(&test_insight("a1", "x.com", 0.8, now)).unwrap();
    store.store_insight(&test_insight("a2", "y.com", 0.6, now + 1)).unwrap();

    let results = store.agent_insights("agent-alpha", 5).unwrap();
    assert_eq!(results.len(), 2);
    for insight in &results {
        let perf = insight.agent_performance.as_ref().unwrap();
        assert_eq!(perf.agent_name, "agent-alpha");
        assert_eq!(perf.total_insights, 2);
    }
}

#[test]
fn test_agent_insights_unknown_agent_is_empty() {
    let (store, _temp_dir) = create_test_store();
    let results = store.agent_insights("nobody", 5).unwrap();
    assert!(results.is_empty());
}

#[test]
fn test_search_text_matches_indexed_columns() {
    let (store, _temp_dir) = create_test_store();
    let now = Utc::now().timestamp();
    store.store_insight(&test_insight("a1", "example.com", 0.9, now)).unwrap();
    store.store_insight(&test_insight("b1", "other.net", 0.9, now)).unwrap();

    let results = store.search_insights("example", &SearchFilters::default(), 10).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "a1");
}

#[test]
fn test_search_like_metacharacters_are_literal() {
    let (store, _temp_dir) = create_test_store();
    let now = Utc::now().timestamp();
    store.store_insight(&test_insight("a1", "a_b.com", 0.9, now)).unwrap();
    store.store_insight(&test_insight("b1", "axb.com", 0.9, now)).unwrap();

    let results = store.search_insights("a_b", &SearchFilters::default(), 10).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "a1");
}

#[test]
fn test_search_filters_combine_with_and() {
    let (store, _temp_dir) = create_test_store();
    let now = Utc::now().timestamp();
    store.store_insight(&test_insight("a1", "x.com", 0.92, now)).unwrap();
    store.store_insight(&test_insight("a2", "x.com", 0.40, now)).unwrap();
    let mut other_agent = test_insight("a3", "x.com", 0.95, now);
    other_agent.agent_name = Some("agent-beta".to_owned());
    store.store_insight(&other_agent).unwrap();

    let filters = SearchFilters {
        domain: Some("x.com".to_owned()),
        agent: Some("agent-alpha".to_owned()),
        min_quality: Some(0.5),
        ..SearchFilters::default()
    };
    let results = store.search_insights("", &filters, 10).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "a1");
}

#[test]
fn test_search_since_filter() {
    let (store, _temp_dir) = create_test_store();
    let now = Utc::now().timestamp();
    store.store_insight(&test_insight("old", "x.com", 0.9, now - 1000)).unwrap();
    store.store_insight(&test_insight("new", "x.com", 0.9, now)).unwrap();

    let filters = SearchFilters { since: Some(now - 10), ..SearchFilters::default() };
    let results = store.search_insights("", &filters, 10).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "new");
}

#[test]
fn test_search_no_results_is_empty_not_error() {
    let (store, _temp_dir) = create_test_store();
    let results = store.search_insights("nothing", &SearchFilters::default(), 10).unwrap();
    assert!(results.is_empty());
}

#[test]
fn test_end_to_end_scenario() {
    let (store, _temp_dir) = create_test_store();
    let t = Utc::now().timestamp() - 60;

    store.store_insight(&test_insight("a1", "x.com", 0.92, t)).unwrap();
    let results = store.insights_by_domain("x.com", 5).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "a1");
    assert!((results[0].quality_score - 0.92).abs() < f64::EPSILON);

    store.store_insight(&test_insight("a2", "x.com", 0.40, t + 1)).unwrap();

    let by_quality = store.insights_by_quality_range(0.5, 1.0, 5).unwrap();
    let ids: Vec<&str> = by_quality.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["a1"]);

    let recent = store.recent_insights(1, 5).unwrap();
    let ids: Vec<&str> = recent.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["a2", "a1"]);
}
