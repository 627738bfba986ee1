//! Graph Writer — 정규화 이벤트를 그래프에 기록
//!
//! 쓰기 순서는 고정되어 있습니다:
//!
//! 1. 이벤트 노드 생성 (정책에 따라 CREATE 또는 내용 해시 MERGE)
//! 2. 엔티티 조각별 merge-or-create (마지막 쓰기 우선 속성 병합)
//! 3. 타입별 관계 생성 (GENERATED / TARGETS / PERFORMED)
//!
//! 1단계가 성공하면 이벤트 노드는 내구적입니다. 엔티티 쓰기 실패는
//! 로그와 메트릭으로만 기록되며 이벤트 쓰기를 중단시키지 않습니다.

use std::sync::Arc;

use graphwatch_core::error::StorageError;
use graphwatch_core::metrics::{
    GRAPH_ENTITY_MERGES_TOTAL, GRAPH_ENTITY_WRITE_FAILURES_TOTAL, GRAPH_EVENTS_WRITTEN_TOTAL,
    GRAPH_WRITE_FAILURES_TOTAL, LABEL_RELATIONSHIP,
};
use graphwatch_core::store::{GraphStore, Params};
use graphwatch_core::types::{CanonicalEvent, EntityFragment, property_map_to_json};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cypher;
use crate::entity;

/// 재전달 이벤트 중복 정책
///
/// 큐 전송은 at-least-once이므로 동일 이벤트가 두 번 도착할 수 있습니다.
/// 기본 정책은 append-only로, 재전달은 별개의 이벤트 노드가 됩니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EventDedupPolicy {
    /// 모든 전달을 별개의 이벤트 노드로 기록 (기본)
    #[default]
    AppendOnly,
    /// 이벤트 내용의 결정적 해시로 병합 (재전달이 한 노드로 수렴)
    MergeByContentHash,
}

impl EventDedupPolicy {
    /// 설정 문자열에서 정책을 파싱합니다.
    pub fn from_config(value: &str) -> Option<Self> {
        match value {
            "append-only" => Some(Self::AppendOnly),
            "merge-by-hash" => Some(Self::MergeByContentHash),
            _ => None,
        }
    }
}

/// 엔티티 조각의 관계 종류
#[derive(Debug, Clone, Copy)]
enum Relationship {
    Generated,
    Targets,
    Performed,
}

impl Relationship {
    fn name(self) -> &'static str {
        match self {
            Self::Generated => "GENERATED",
            Self::Targets => "TARGETS",
            Self::Performed => "PERFORMED",
        }
    }

    fn default_entity_type(self) -> &'static str {
        match self {
            Self::Generated | Self::Targets => "Unknown",
            Self::Performed => "User",
        }
    }

    fn statement(self, label: &str, dedup_edge: bool) -> String {
        match self {
            Self::Generated => cypher::merge_generated(label, dedup_edge),
            Self::Targets => cypher::merge_targets(label, dedup_edge),
            Self::Performed => cypher::merge_performed(label, dedup_edge),
        }
    }
}

/// 정규화 이벤트를 그래프에 기록하는 쓰기 경로
pub struct GraphWriter {
    store: Arc<dyn GraphStore>,
    dedup: EventDedupPolicy,
}

impl GraphWriter {
    /// append-only 정책으로 새 writer를 생성합니다.
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            dedup: EventDedupPolicy::AppendOnly,
        }
    }

    /// 중복 정책을 지정합니다.
    pub fn with_dedup_policy(mut self, dedup: EventDedupPolicy) -> Self {
        self.dedup = dedup;
        self
    }

    /// 이벤트를 기록하고 이벤트 노드 ID를 반환합니다.
    ///
    /// # Errors
    ///
    /// 이벤트 노드 쓰기(1단계)가 실패한 경우에만 에러를 반환합니다.
    /// 엔티티/관계 쓰기 실패는 격리됩니다.
    pub async fn write(&self, event: &CanonicalEvent) -> Result<String, StorageError> {
        let event_id = match self.dedup {
            EventDedupPolicy::AppendOnly => Uuid::new_v4().to_string(),
            EventDedupPolicy::MergeByContentHash => content_hash(event),
        };

        if let Err(e) = self.write_event_node(&event_id, event).await {
            metrics::counter!(GRAPH_WRITE_FAILURES_TOTAL).increment(1);
            return Err(e);
        }
        metrics::counter!(GRAPH_EVENTS_WRITTEN_TOTAL).increment(1);
        debug!(event_id, "event node written");

        if let Some(src) = &event.src {
            self.write_entity(&event_id, src, Relationship::Generated)
                .await;
        }
        if let Some(dst) = &event.dst {
            self.write_entity(&event_id, dst, Relationship::Targets)
                .await;
        }
        if let Some(principal) = &event.principal {
            self.write_entity(&event_id, principal, Relationship::Performed)
                .await;
        }

        Ok(event_id)
    }

    async fn write_event_node(
        &self,
        event_id: &str,
        event: &CanonicalEvent,
    ) -> Result<(), StorageError> {
        let metadata = serde_json::Value::Object(property_map_to_json(&event.metadata)).to_string();
        match self.dedup {
            EventDedupPolicy::AppendOnly => {
                let mut params = Params::new();
                params.insert("event_id".to_owned(), serde_json::json!(event_id));
                params.insert("class_uid".to_owned(), serde_json::json!(event.class_uid));
                params.insert(
                    "category_uid".to_owned(),
                    serde_json::json!(event.category_uid),
                );
                params.insert("time".to_owned(), serde_json::json!(event.time));
                params.insert("severity".to_owned(), serde_json::json!(event.severity));
                params.insert("message".to_owned(), serde_json::json!(event.message));
                params.insert("metadata".to_owned(), serde_json::json!(metadata));
                self.store.execute_write(cypher::CREATE_EVENT, params).await
            }
            EventDedupPolicy::MergeByContentHash => {
                let mut params = Params::new();
                params.insert("event_id".to_owned(), serde_json::json!(event_id));
                params.insert(
                    "props".to_owned(),
                    serde_json::json!({
                        "class_uid": event.class_uid,
                        "category_uid": event.category_uid,
                        "time": event.time,
                        "severity": event.severity,
                        "message": event.message,
                        "metadata": metadata,
                    }),
                );
                self.store
                    .execute_write(cypher::MERGE_EVENT_BY_ID, params)
                    .await
            }
        }
    }

    /// 엔티티 병합 + 관계 생성. 실패해도 이벤트 쓰기는 계속됩니다.
    async fn write_entity(&self, event_id: &str, fragment: &EntityFragment, rel: Relationship) {
        let resolved = match entity::resolve(fragment, rel.default_entity_type()) {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(event_id, relationship = rel.name(), error = %e, "entity resolution failed");
                metrics::counter!(GRAPH_ENTITY_WRITE_FAILURES_TOTAL).increment(1);
                return;
            }
        };

        let mut params = Params::new();
        params.insert(
            "entity_id".to_owned(),
            serde_json::json!(resolved.identity_key),
        );
        params.insert(
            "props".to_owned(),
            serde_json::Value::Object(property_map_to_json(&resolved.properties)),
        );
        params.insert("event_id".to_owned(), serde_json::json!(event_id));

        // merge-by-hash에서는 이벤트 노드가 재전달에서 병합되므로
        // 관계도 MERGE로 중복을 막습니다.
        let dedup_edge = self.dedup == EventDedupPolicy::MergeByContentHash;
        let statement = rel.statement(&resolved.entity_type, dedup_edge);
        match self.store.execute_write(&statement, params).await {
            Ok(()) => {
                metrics::counter!(GRAPH_ENTITY_MERGES_TOTAL, LABEL_RELATIONSHIP => rel.name())
                    .increment(1);
            }
            Err(e) => {
                warn!(
                    event_id,
                    relationship = rel.name(),
                    entity_type = resolved.entity_type.as_str(),
                    error = %e,
                    "entity write failed"
                );
                metrics::counter!(GRAPH_ENTITY_WRITE_FAILURES_TOTAL).increment(1);
            }
        }
    }
}

/// 이벤트 내용의 결정적 해시를 계산합니다.
fn content_hash(event: &CanonicalEvent) -> String {
    let digest = Sha256::digest(event.to_value().to_string().as_bytes());
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use graphwatch_core::types::Row;
    use std::sync::Mutex;

    /// 실행된 문장을 기록하는 테스트 스토어
    struct RecordingStore {
        writes: Mutex<Vec<(String, Params)>>,
        /// 이 부분 문자열을 포함한 문장은 실패 처리
        fail_on: Option<&'static str>,
    }

    impl RecordingStore {
        fn new() -> Self {
            Self {
                writes: Mutex::new(Vec::new()),
                fail_on: None,
            }
        }

        fn failing_on(substring: &'static str) -> Self {
            Self {
                writes: Mutex::new(Vec::new()),
                fail_on: Some(substring),
            }
        }

        fn writes(&self) -> Vec<(String, Params)> {
            self.writes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GraphStore for RecordingStore {
        async fn execute_query(
            &self,
            _query: &str,
            _params: Params,
        ) -> Result<Vec<Row>, StorageError> {
            Ok(Vec::new())
        }

        async fn execute_write(&self, query: &str, params: Params) -> Result<(), StorageError> {
            if let Some(fail_on) = self.fail_on {
                if query.contains(fail_on) {
                    return Err(StorageError::WriteFailed {
                        statement: query.to_owned(),
                        reason: "injected failure".to_owned(),
                    });
                }
            }
            self.writes
                .lock()
                .unwrap()
                .push((query.to_owned(), params));
            Ok(())
        }
    }

    fn sample_event() -> CanonicalEvent {
        CanonicalEvent::from_value(serde_json::json!({
            "class_uid": "0001",
            "category_uid": "0002",
            "time": "2024-01-15T12:00:00Z",
            "severity": 7,
            "message": "Failed password for root",
            "src": {"type": "IP", "id": "ip-001", "ip": "192.168.1.100"},
            "dst": {"type": "Host", "id": "srv-01"},
            "principal": {"type": "User", "id": "u-root"}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn write_emits_event_then_entities_in_order() {
        let store = Arc::new(RecordingStore::new());
        let writer = GraphWriter::new(store.clone());
        let event_id = writer.write(&sample_event()).await.unwrap();

        let writes = store.writes();
        assert_eq!(writes.len(), 4);
        assert!(writes[0].0.starts_with("CREATE (e:Event"));
        assert!(writes[1].0.contains("[:GENERATED]"));
        assert!(writes[2].0.contains("[:TARGETS]"));
        assert!(writes[3].0.contains("[:PERFORMED]"));

        // 모든 엔티티 문장이 이벤트 노드를 참조
        for (_, params) in &writes[1..] {
            assert_eq!(params.get("event_id"), Some(&serde_json::json!(event_id)));
        }
    }

    #[tokio::test]
    async fn event_params_serialize_metadata_as_string() {
        let store = Arc::new(RecordingStore::new());
        let writer = GraphWriter::new(store.clone());
        let mut event = sample_event();
        event.metadata = graphwatch_core::types::property_map_from_json(
            serde_json::json!({"version": "1.0.0"}).as_object().unwrap(),
        );
        writer.write(&event).await.unwrap();

        let writes = store.writes();
        let metadata = writes[0].1.get("metadata").unwrap();
        assert!(metadata.is_string());
        assert!(metadata.as_str().unwrap().contains("1.0.0"));
    }

    #[tokio::test]
    async fn entity_failure_does_not_abort_event_write() {
        let store = Arc::new(RecordingStore::failing_on("[:TARGETS]"));
        let writer = GraphWriter::new(store.clone());
        let result = writer.write(&sample_event()).await;
        assert!(result.is_ok());

        // 이벤트 + GENERATED + PERFORMED는 기록됨
        let writes = store.writes();
        assert_eq!(writes.len(), 3);
        assert!(writes.iter().any(|(q, _)| q.contains("[:PERFORMED]")));
    }

    #[tokio::test]
    async fn event_node_failure_is_an_error() {
        let store = Arc::new(RecordingStore::failing_on("CREATE (e:Event"));
        let writer = GraphWriter::new(store.clone());
        let result = writer.write(&sample_event()).await;
        assert!(matches!(result, Err(StorageError::WriteFailed { .. })));
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn invalid_entity_label_is_isolated() {
        let store = Arc::new(RecordingStore::new());
        let writer = GraphWriter::new(store.clone());
        let mut event = sample_event();
        event.src = Some(graphwatch_core::types::EntityFragment {
            entity_type: Some("IP) DETACH DELETE (n".to_owned()),
            id: Some("x".to_owned()),
            properties: Default::default(),
        });
        writer.write(&event).await.unwrap();

        // src는 건너뛰고 dst/principal은 기록됨
        let writes = store.writes();
        assert!(!writes.iter().any(|(q, _)| q.contains("DETACH")));
        assert!(writes.iter().any(|(q, _)| q.contains("[:TARGETS]")));
    }

    #[tokio::test]
    async fn append_only_gives_distinct_ids_for_redelivery() {
        let store = Arc::new(RecordingStore::new());
        let writer = GraphWriter::new(store.clone());
        let event = sample_event();
        let first = writer.write(&event).await.unwrap();
        let second = writer.write(&event).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(
            store
                .writes()
                .iter()
                .filter(|(q, _)| q.starts_with("CREATE (e:Event"))
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn merge_by_hash_converges_redelivery_to_one_id() {
        let store = Arc::new(RecordingStore::new());
        let writer =
            GraphWriter::new(store.clone()).with_dedup_policy(EventDedupPolicy::MergeByContentHash);
        let event = sample_event();
        let first = writer.write(&event).await.unwrap();
        let second = writer.write(&event).await.unwrap();
        assert_eq!(first, second);
        assert!(
            store
                .writes()
                .iter()
                .all(|(q, _)| !q.starts_with("CREATE (e:Event"))
        );
        // 이벤트 노드가 병합되므로 관계 절도 MERGE여야 중복 간선이 없음
        assert!(
            store
                .writes()
                .iter()
                .filter(|(q, _)| q.contains("[:GENERATED]"))
                .all(|(q, _)| q.contains("MERGE (s)-[:GENERATED]->(e)"))
        );
    }

    #[tokio::test]
    async fn merge_by_hash_diverges_on_content_difference() {
        let store = Arc::new(RecordingStore::new());
        let writer =
            GraphWriter::new(store.clone()).with_dedup_policy(EventDedupPolicy::MergeByContentHash);
        let event = sample_event();
        let mut other = sample_event();
        other.message = "different".to_owned();
        let first = writer.write(&event).await.unwrap();
        let second = writer.write(&other).await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn event_without_fragments_writes_single_statement() {
        let store = Arc::new(RecordingStore::new());
        let writer = GraphWriter::new(store.clone());
        let event = CanonicalEvent::default();
        writer.write(&event).await.unwrap();
        assert_eq!(store.writes().len(), 1);
    }

    #[test]
    fn dedup_policy_from_config() {
        assert_eq!(
            EventDedupPolicy::from_config("append-only"),
            Some(EventDedupPolicy::AppendOnly)
        );
        assert_eq!(
            EventDedupPolicy::from_config("merge-by-hash"),
            Some(EventDedupPolicy::MergeByContentHash)
        );
        assert_eq!(EventDedupPolicy::from_config("bogus"), None);
    }
}
