//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`
//! 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `graphwatch_`
//! - 모듈명: `ingest_`, `normalize_`, `graph_`, `detection_`
//! - 접미어: `_total` (counter), 없음 (gauge)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 소스 형식 레이블 키 (ocsf, syslog, cef, leef, unknown)
pub const LABEL_FORMAT: &str = "format";

/// 관계 종류 레이블 키 (GENERATED, TARGETS, PERFORMED)
pub const LABEL_RELATIONSHIP: &str = "relationship";

/// 규칙 ID 레이블 키
pub const LABEL_RULE_ID: &str = "rule_id";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

// ─── Ingest / Normalize 메트릭 ─────────────────────────────────────

/// 인제스트된 전체 이벤트 수 (counter, label: format)
pub const INGEST_EVENTS_TOTAL: &str = "graphwatch_ingest_events_total";

/// 역직렬화 실패로 버려진 큐 메시지 수 (counter)
pub const INGEST_MALFORMED_TOTAL: &str = "graphwatch_ingest_malformed_total";

/// 알 수 없는 형식으로 passthrough 처리된 이벤트 수 (counter)
pub const NORMALIZE_FALLBACK_TOTAL: &str = "graphwatch_normalize_fallback_total";

// ─── Graph Writer 메트릭 ───────────────────────────────────────────

/// 생성된 이벤트 노드 수 (counter)
pub const GRAPH_EVENTS_WRITTEN_TOTAL: &str = "graphwatch_graph_events_written_total";

/// 병합된 엔티티 노드 수 (counter, label: relationship)
pub const GRAPH_ENTITY_MERGES_TOTAL: &str = "graphwatch_graph_entity_merges_total";

/// 실패한 엔티티 쓰기 수 (counter)
pub const GRAPH_ENTITY_WRITE_FAILURES_TOTAL: &str =
    "graphwatch_graph_entity_write_failures_total";

/// 실패한 이벤트 쓰기 수 (counter)
pub const GRAPH_WRITE_FAILURES_TOTAL: &str = "graphwatch_graph_write_failures_total";

// ─── Detection 메트릭 ──────────────────────────────────────────────

/// 실행된 규칙 수 (counter, label: result)
pub const DETECTION_RUNS_TOTAL: &str = "graphwatch_detection_runs_total";

/// 생성된 알림 수 (counter, label: rule_id)
pub const DETECTION_ALERTS_TOTAL: &str = "graphwatch_detection_alerts_total";

/// 그래프에 기록된 알림 수 (counter)
pub const DETECTION_ALERTS_STORED_TOTAL: &str = "graphwatch_detection_alerts_stored_total";

/// 등록된 규칙 수 (gauge)
pub const DETECTION_RULES_LOADED: &str = "graphwatch_detection_rules_loaded";
