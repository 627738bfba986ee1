//! 인메모리 그래프 백엔드
//!
//! 실제 스토어 없이 writer/alert store의 문장 템플릿을 해석하는 백엔드입니다.
//! 범용 쿼리 엔진이 아닙니다. [`cypher`](crate::cypher)의 템플릿만 이해하며,
//! 그 외의 불투명 쿼리(탐지 규칙 등)는 미리 등록된 canned 결과로 응답합니다.
//! 테스트와 데몬의 `memory` 백엔드 모드에서 사용됩니다.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use graphwatch_core::error::StorageError;
use graphwatch_core::store::{GraphStore, Params};
use graphwatch_core::types::{PropertyMap, PropertyValue, ResultValue, Row, property_map_from_json};

/// 저장된 노드
#[derive(Debug, Clone)]
struct NodeRecord {
    id: u64,
    labels: Vec<String>,
    properties: PropertyMap,
}

/// 저장된 관계
#[derive(Debug, Clone)]
struct EdgeRecord {
    rel_type: String,
    start: u64,
    end: u64,
}

#[derive(Default)]
struct Inner {
    nodes: Vec<NodeRecord>,
    edges: Vec<EdgeRecord>,
    next_id: u64,
    canned: HashMap<String, Vec<Row>>,
}

/// 인메모리 그래프 스토어
#[derive(Default)]
pub struct MemoryGraphStore {
    inner: Mutex<Inner>,
}

impl MemoryGraphStore {
    /// 빈 스토어를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 불투명 쿼리에 대한 canned 결과를 등록합니다.
    ///
    /// 동일한 쿼리 문자열로 `execute_query`가 호출되면 등록된 행을
    /// 반환합니다. 탐지 규칙 테스트에 사용합니다.
    pub fn register_canned(&self, query: impl Into<String>, rows: Vec<Row>) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.canned.insert(query.into(), rows);
    }

    /// 전체 노드 수
    pub fn node_count(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).nodes.len()
    }

    /// 특정 레이블을 가진 노드 수
    pub fn count_label(&self, label: &str) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .nodes
            .iter()
            .filter(|n| n.labels.iter().any(|l| l == label))
            .count()
    }

    /// 특정 타입의 관계 수
    pub fn count_edges(&self, rel_type: &str) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .edges
            .iter()
            .filter(|e| e.rel_type == rel_type)
            .count()
    }
}

impl Inner {
    fn create_node(&mut self, labels: Vec<String>, properties: PropertyMap) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.nodes.push(NodeRecord {
            id,
            labels,
            properties,
        });
        id
    }

    fn find_node(&self, label: &str, key: &str, value: &str) -> Option<usize> {
        self.nodes.iter().position(|n| {
            n.labels.iter().any(|l| l == label)
                && matches!(n.properties.get(key), Some(PropertyValue::Str(s)) if s == value)
        })
    }

}

/// 파라미터에서 문자열 값을 꺼냅니다.
fn str_param(params: &Params, key: &str) -> Result<String, StorageError> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .ok_or_else(|| StorageError::WriteFailed {
            statement: String::new(),
            reason: format!("missing string parameter '{key}'"),
        })
}

/// 파라미터에서 오브젝트 값을 속성 맵으로 꺼냅니다.
fn map_param(params: &Params, key: &str) -> PropertyMap {
    params
        .get(key)
        .and_then(|v| v.as_object())
        .map(property_map_from_json)
        .unwrap_or_default()
}

/// 병합 문장에서 삽입된 레이블을 추출합니다.
///
/// 템플릿 형태는 `MERGE ({var}:{label} {...`로 고정되어 있습니다.
fn merge_label(statement: &str) -> Option<&str> {
    let after = statement.strip_prefix("MERGE (")?;
    let colon = after.find(':')?;
    let rest = &after[colon + 1..];
    let end = rest.find([' ', '{'])?;
    Some(&rest[..end])
}

/// 알림 연결 문장에서 엔티티 레이블을 추출합니다.
///
/// 템플릿 형태는 `... MATCH (n:{label} {id: $entity_id}) ...`로 고정되어
/// 있습니다.
fn link_label(statement: &str) -> Option<&str> {
    let start = statement.find("MATCH (n:")?;
    let rest = &statement[start + "MATCH (n:".len()..];
    let end = rest.find([' ', '{'])?;
    Some(&rest[..end])
}

fn node_to_result(node: &NodeRecord) -> ResultValue {
    ResultValue::Node {
        id: node.id.to_string(),
        labels: node.labels.clone(),
        properties: node.properties.clone(),
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn execute_query(&self, query: &str, params: Params) -> Result<Vec<Row>, StorageError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        // 알림 목록 조회
        if query.starts_with("MATCH (a:Alert)") && query.contains("RETURN a") {
            let severity = params.get("severity").and_then(|v| v.as_u64());
            let rule_id = params.get("rule_id").and_then(|v| v.as_str());
            let limit = params
                .get("limit")
                .and_then(|v| v.as_u64())
                .unwrap_or(u64::MAX) as usize;

            let mut matches: Vec<&NodeRecord> = inner
                .nodes
                .iter()
                .filter(|n| n.labels.iter().any(|l| l == "Alert"))
                .filter(|n| match severity {
                    Some(want) => {
                        matches!(n.properties.get("severity"), Some(PropertyValue::Num(have)) if *have as u64 == want)
                    }
                    None => true,
                })
                .filter(|n| match rule_id {
                    Some(want) => {
                        matches!(n.properties.get("rule_id"), Some(PropertyValue::Str(have)) if have == want)
                    }
                    None => true,
                })
                .collect();
            matches.sort_by(|a, b| {
                let key = |n: &NodeRecord| match n.properties.get("timestamp") {
                    Some(PropertyValue::Str(s)) => s.clone(),
                    _ => String::new(),
                };
                key(b).cmp(&key(a))
            });

            return Ok(matches
                .into_iter()
                .take(limit)
                .map(|n| {
                    let mut row = Row::new();
                    row.push("a", node_to_result(n));
                    row
                })
                .collect());
        }

        // 알림의 연루 엔티티 조회
        if query.starts_with("MATCH (a:Alert {alert_id: $alert_id})-[:INVOLVES]->(e)") {
            let alert_id = str_param(&params, "alert_id")?;
            let Some(alert_idx) = inner.find_node("Alert", "alert_id", &alert_id) else {
                return Ok(Vec::new());
            };
            let alert_node_id = inner.nodes[alert_idx].id;
            return Ok(inner
                .edges
                .iter()
                .filter(|e| e.rel_type == "INVOLVES" && e.start == alert_node_id)
                .filter_map(|e| inner.nodes.iter().find(|n| n.id == e.end))
                .map(|n| {
                    let mut row = Row::new();
                    row.push("e", node_to_result(n));
                    row
                })
                .collect());
        }

        // 불투명 쿼리: 등록된 canned 결과
        Ok(inner.canned.get(query).cloned().unwrap_or_default())
    }

    async fn execute_write(&self, query: &str, params: Params) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        // 이벤트 노드 생성 (append-only)
        if query.starts_with("CREATE (e:Event") {
            let mut properties = PropertyMap::new();
            for (key, value) in &params {
                properties.insert(key.clone(), PropertyValue::from_json(value));
            }
            inner.create_node(vec!["Event".to_owned()], properties);
            return Ok(());
        }

        // 이벤트 노드 병합 (merge-by-hash)
        if query.starts_with("MERGE (e:Event {event_id: $event_id})") {
            let event_id = str_param(&params, "event_id")?;
            if inner.find_node("Event", "event_id", &event_id).is_none() {
                let mut properties = map_param(&params, "props");
                properties.insert("event_id".to_owned(), PropertyValue::Str(event_id));
                inner.create_node(vec!["Event".to_owned()], properties);
            }
            return Ok(());
        }

        // 엔티티 병합 + 관계 생성
        if query.starts_with("MERGE (") && query.contains("MATCH (e:Event {event_id: $event_id})")
        {
            let label = merge_label(query).ok_or_else(|| StorageError::WriteFailed {
                statement: query.to_owned(),
                reason: "unparseable merge label".to_owned(),
            })?;
            let entity_id = str_param(&params, "entity_id")?;
            let props = map_param(&params, "props");
            let event_id = str_param(&params, "event_id")?;

            let entity_node_id = match inner.find_node(label, "id", &entity_id) {
                Some(idx) => {
                    // 마지막 쓰기 우선 속성 병합
                    for (key, value) in props {
                        inner.nodes[idx].properties.insert(key, value);
                    }
                    inner.nodes[idx].id
                }
                None => {
                    let mut properties = props;
                    properties.insert("id".to_owned(), PropertyValue::Str(entity_id));
                    inner.create_node(vec![label.to_owned()], properties)
                }
            };

            let Some(event_idx) = inner.find_node("Event", "event_id", &event_id) else {
                return Err(StorageError::WriteFailed {
                    statement: query.to_owned(),
                    reason: format!("event node not found: {event_id}"),
                });
            };
            let event_node_id = inner.nodes[event_idx].id;

            let (rel_type, start, end) = if query.contains("[:GENERATED]") {
                ("GENERATED", entity_node_id, event_node_id)
            } else if query.contains("[:TARGETS]") {
                ("TARGETS", event_node_id, entity_node_id)
            } else if query.contains("[:PERFORMED]") {
                ("PERFORMED", entity_node_id, event_node_id)
            } else {
                return Err(StorageError::WriteFailed {
                    statement: query.to_owned(),
                    reason: "unknown relationship in merge statement".to_owned(),
                });
            };

            // 관계 절이 MERGE면(merge-by-hash 정책) 중복 간선을 만들지 않음
            let dedup_edge = query.contains("}) MERGE (");
            let exists = dedup_edge
                && inner
                    .edges
                    .iter()
                    .any(|e| e.rel_type == rel_type && e.start == start && e.end == end);
            if !exists {
                inner.edges.push(EdgeRecord {
                    rel_type: rel_type.to_owned(),
                    start,
                    end,
                });
            }
            return Ok(());
        }

        // 알림 노드 생성
        if query.starts_with("CREATE (a:Alert") {
            let mut properties = PropertyMap::new();
            for (key, value) in &params {
                properties.insert(key.clone(), PropertyValue::from_json(value));
            }
            inner.create_node(vec!["Alert".to_owned()], properties);
            return Ok(());
        }

        // 알림-엔티티 연결
        if query.starts_with("MATCH (a:Alert {alert_id: $alert_id})")
            && query.contains("[:INVOLVES]")
        {
            let label = link_label(query).ok_or_else(|| StorageError::WriteFailed {
                statement: query.to_owned(),
                reason: "unparseable link label".to_owned(),
            })?;
            let alert_id = str_param(&params, "alert_id")?;
            let entity_id = str_param(&params, "entity_id")?;
            let alert = inner.find_node("Alert", "alert_id", &alert_id);
            let entity = inner.find_node(label, "id", &entity_id);
            // MATCH 의미론: 한쪽이라도 없으면 관계 없이 0행으로 끝남
            if let (Some(alert_idx), Some(entity_idx)) = (alert, entity) {
                let start = inner.nodes[alert_idx].id;
                let end = inner.nodes[entity_idx].id;
                let exists = inner
                    .edges
                    .iter()
                    .any(|e| e.rel_type == "INVOLVES" && e.start == start && e.end == end);
                if !exists {
                    inner.edges.push(EdgeRecord {
                        rel_type: "INVOLVES".to_owned(),
                        start,
                        end,
                    });
                }
            }
            return Ok(());
        }

        Err(StorageError::WriteFailed {
            statement: query.to_owned(),
            reason: "statement not supported by memory backend".to_owned(),
        })
    }
}
