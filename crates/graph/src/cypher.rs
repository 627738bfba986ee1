//! Graph Writer / Alert Store의 파라미터화 문장 템플릿
//!
//! 모든 값은 바인딩 파라미터로 전달됩니다. 유일한 예외는 엔티티 타입
//! 레이블로, 레이블은 파라미터가 될 수 없으므로 [`entity::validate_label`]
//! (crate::entity::validate_label) 검증을 통과한 뒤 문자열로 삽입됩니다.

use graphwatch_core::store::Params;

/// 이벤트 노드 생성 (append-only 정책)
pub const CREATE_EVENT: &str = "CREATE (e:Event {event_id: $event_id, class_uid: $class_uid, \
category_uid: $category_uid, time: $time, severity: $severity, message: $message, \
metadata: $metadata})";

/// 이벤트 노드 병합 (merge-by-hash 정책)
///
/// `$event_id`가 이벤트 내용의 결정적 해시일 때, 재전달된 동일 이벤트가
/// 하나의 노드로 수렴합니다.
pub const MERGE_EVENT_BY_ID: &str =
    "MERGE (e:Event {event_id: $event_id}) ON CREATE SET e += $props";

/// 알림 노드 생성
pub const CREATE_ALERT: &str = "CREATE (a:Alert {alert_id: $alert_id, rule_id: $rule_id, \
timestamp: $timestamp, severity: $severity, context: $context})";

/// 알림과 연루 엔티티 연결
///
/// 엔티티는 인제스트가 기록한 정체성 규약, 즉 타입 레이블 + `id` 속성
/// 쌍으로 매칭됩니다. 같은 `id`를 가진 다른 타입의 엔티티는 연결되지
/// 않습니다.
pub fn link_alert_entity(label: &str) -> String {
    format!(
        "MATCH (a:Alert {{alert_id: $alert_id}}) \
MATCH (n:{label} {{id: $entity_id}}) MERGE (a)-[:INVOLVES]->(n)"
    )
}

/// 알림의 연루 엔티티 조회
pub const LIST_ALERT_ENTITIES: &str =
    "MATCH (a:Alert {alert_id: $alert_id})-[:INVOLVES]->(e) RETURN e";

/// 관계 절의 동사를 고릅니다.
///
/// append-only 정책에서는 이벤트 노드가 매번 새로 생기므로 CREATE면
/// 충분합니다. merge-by-hash 정책에서는 재전달이 같은 이벤트 노드로
/// 수렴하므로, 관계도 MERGE해야 중복 간선이 생기지 않습니다.
fn edge_verb(dedup_edge: bool) -> &'static str {
    if dedup_edge { "MERGE" } else { "CREATE" }
}

/// 출발지 엔티티 병합 + `(s)-[:GENERATED]->(e)` 관계
pub fn merge_generated(label: &str, dedup_edge: bool) -> String {
    let verb = edge_verb(dedup_edge);
    format!(
        "MERGE (s:{label} {{id: $entity_id}}) ON CREATE SET s += $props SET s += $props \
WITH s MATCH (e:Event {{event_id: $event_id}}) {verb} (s)-[:GENERATED]->(e)"
    )
}

/// 목적지 엔티티 병합 + `(e)-[:TARGETS]->(d)` 관계
pub fn merge_targets(label: &str, dedup_edge: bool) -> String {
    let verb = edge_verb(dedup_edge);
    format!(
        "MERGE (d:{label} {{id: $entity_id}}) ON CREATE SET d += $props SET d += $props \
WITH d MATCH (e:Event {{event_id: $event_id}}) {verb} (e)-[:TARGETS]->(d)"
    )
}

/// 행위자 엔티티 병합 + `(p)-[:PERFORMED]->(e)` 관계
pub fn merge_performed(label: &str, dedup_edge: bool) -> String {
    let verb = edge_verb(dedup_edge);
    format!(
        "MERGE (p:{label} {{id: $entity_id}}) ON CREATE SET p += $props SET p += $props \
WITH p MATCH (e:Event {{event_id: $event_id}}) {verb} (p)-[:PERFORMED]->(e)"
    )
}

/// 알림 목록 조회 문장과 파라미터를 만듭니다.
///
/// 필터가 없으면 전체 알림을 최신순으로 `$limit`개 반환합니다.
pub fn build_alert_listing(
    severity: Option<u8>,
    rule_id: Option<&str>,
    limit: usize,
) -> (String, Params) {
    let mut query = "MATCH (a:Alert)".to_owned();
    let mut clauses = Vec::new();
    let mut params = Params::new();

    if let Some(severity) = severity {
        clauses.push("a.severity = $severity");
        params.insert("severity".to_owned(), serde_json::json!(severity));
    }
    if let Some(rule_id) = rule_id {
        clauses.push("a.rule_id = $rule_id");
        params.insert("rule_id".to_owned(), serde_json::json!(rule_id));
    }
    if !clauses.is_empty() {
        query.push_str(" WHERE ");
        query.push_str(&clauses.join(" AND "));
    }
    query.push_str(" RETURN a ORDER BY a.timestamp DESC LIMIT $limit");
    params.insert("limit".to_owned(), serde_json::json!(limit));

    (query, params)
}
