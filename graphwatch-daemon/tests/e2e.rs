//! End-to-end pipeline scenarios against the in-memory graph backend.
//!
//! Exercises the full ingest path (raw JSON -> normalize -> graph write),
//! duplicate delivery behavior under both dedup policies, and the
//! detect-then-materialize loop (rule -> alert -> graph -> listing).

use std::sync::Arc;

use graphwatch_core::{DetectionRule, PropertyValue, ResultValue, Row};
use graphwatch_daemon::Ingestor;
use graphwatch_detection::{RuleExecutor, RuleRegistry};
use graphwatch_graph::{AlertFilter, AlertStore, EventDedupPolicy, GraphWriter, MemoryGraphStore};
use graphwatch_normalizer::Normalizer;

fn syslog_event(host: &str) -> serde_json::Value {
    serde_json::json!({
        "facility": 4,
        "severity": 3,
        "timestamp": "2026-08-30T10:00:00Z",
        "hostname": host,
        "message": "authentication failure",
        "src": { "type": "IP", "id": "10.0.0.5", "asn": "AS65001" }
    })
}

fn ingestor(store: Arc<MemoryGraphStore>, dedup: EventDedupPolicy) -> Ingestor {
    let writer = GraphWriter::new(store).with_dedup_policy(dedup);
    Ingestor::new(Normalizer::with_defaults(), writer)
}

#[tokio::test]
async fn append_only_duplicates_events_but_merges_entities() {
    let store = Arc::new(MemoryGraphStore::new());
    let ing = ingestor(store.clone(), EventDedupPolicy::AppendOnly);

    let raw = syslog_event("fw-1");
    ing.ingest(&raw, None).await.unwrap();
    ing.ingest(&raw, None).await.unwrap();

    // Redelivery appends a second Event node, but the source entity
    // merges by identity into one node with two GENERATED edges.
    assert_eq!(store.count_label("Event"), 2);
    assert_eq!(store.count_label("IP"), 1);
    assert_eq!(store.count_edges("GENERATED"), 2);
}

#[tokio::test]
async fn merge_by_hash_collapses_redelivery() {
    let store = Arc::new(MemoryGraphStore::new());
    let ing = ingestor(store.clone(), EventDedupPolicy::MergeByContentHash);

    let raw = syslog_event("fw-1");
    let first = ing.ingest(&raw, None).await.unwrap();
    let second = ing.ingest(&raw, None).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(store.count_label("Event"), 1);
    // Relationships merge too, so redelivery adds no second edge.
    assert_eq!(store.count_label("IP"), 1);
    assert_eq!(store.count_edges("GENERATED"), 1);

    ing.ingest(&syslog_event("fw-2"), None).await.unwrap();
    assert_eq!(store.count_label("Event"), 2);
}

#[tokio::test]
async fn detect_store_and_list_alerts() {
    let store = Arc::new(MemoryGraphStore::new());
    let ing = ingestor(store.clone(), EventDedupPolicy::AppendOnly);

    for _ in 0..3 {
        ing.ingest(&syslog_event("fw-1"), None).await.unwrap();
    }

    let rule: DetectionRule = serde_json::from_value(serde_json::json!({
        "rule_id": "RULE-bruteforce",
        "name": "ssh brute force",
        "severity": 8,
        "query": "MATCH (s:IP)-[:GENERATED]->(e:Event) WITH s, count(e) AS n WHERE n >= 3 RETURN s, n"
    }))
    .unwrap();

    // Opaque rule queries are served from the canned-result registry.
    let mut row = Row::new();
    let mut props = graphwatch_core::PropertyMap::new();
    props.insert("id".to_owned(), PropertyValue::Str("10.0.0.5".to_owned()));
    props.insert("asn".to_owned(), PropertyValue::Str("AS65001".to_owned()));
    row.push(
        "s",
        ResultValue::Node {
            id: "0".to_owned(),
            labels: vec!["IP".to_owned()],
            properties: props,
        },
    );
    row.push("n", ResultValue::Scalar(serde_json::json!(3)));
    store.register_canned(rule.query.clone(), vec![row]);

    let mut registry = RuleRegistry::new();
    registry.load(rule).unwrap();

    let executor = RuleExecutor::new(store.clone());
    let report = executor.run(&registry, None).await.unwrap();
    assert!(report.failures.is_empty());
    assert_eq!(report.alerts.len(), 1);

    let alert = &report.alerts[0];
    assert_eq!(alert.rule_id, "RULE-bruteforce");
    assert_eq!(alert.severity, 8);
    assert_eq!(alert.entities.len(), 1);
    assert_eq!(alert.entities[0].entity_type, "IP");
    assert_eq!(alert.entities[0].id, "10.0.0.5");

    let alerts = AlertStore::new(store.clone());
    assert!(alerts.store(alert).await);
    assert_eq!(store.count_label("Alert"), 1);
    // The involved IP node already exists from ingest, so the alert
    // links to it instead of creating a duplicate.
    assert_eq!(store.count_label("IP"), 1);
    assert_eq!(store.count_edges("INVOLVES"), 1);

    let listed = alerts.list(&AlertFilter::default()).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].alert_id, alert.alert_id);
    assert_eq!(listed[0].entities.len(), 1);
    assert_eq!(listed[0].entities[0].entity_type, "IP");

    let none = alerts
        .list(&AlertFilter {
            severity: Some(3),
            ..AlertFilter::default()
        })
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn unknown_format_falls_back_to_passthrough() {
    let store = Arc::new(MemoryGraphStore::new());
    let ing = ingestor(store.clone(), EventDedupPolicy::AppendOnly);

    let raw = serde_json::json!({ "weird": true, "payload": [1, 2, 3] });
    let id = ing.ingest(&raw, None).await.unwrap();
    assert!(!id.is_empty());
    assert_eq!(store.count_label("Event"), 1);
}
