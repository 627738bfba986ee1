//! Neo4j HTTP 트랜잭션 커밋 프로토콜 어댑터
//!
//! 문장 하나당 `POST {uri}/db/{database}/tx/commit` 요청 하나를 보내는
//! 자동 커밋 어댑터입니다. `resultDataContents: ["row", "graph"]`를 요청하여
//! 행의 `meta` 항목과 `graph` 섹션을 결합해 노드 레이블을 복원합니다.
//!
//! 전송 실패는 [`StorageError::Unavailable`]로, 서버가 보고한 문장 에러는
//! [`StorageError::WriteFailed`] / [`StorageError::QueryFailed`]로 변환됩니다.
//! 내부 재시도는 없습니다.

use async_trait::async_trait;
use graphwatch_core::error::StorageError;
use graphwatch_core::store::{GraphStore, Params};
use graphwatch_core::types::{ResultValue, Row, property_map_from_json};
use serde::Deserialize;
use tracing::trace;

/// Neo4j HTTP 어댑터
pub struct HttpGraphStore {
    client: reqwest::Client,
    endpoint: String,
    user: String,
    password: String,
}

impl HttpGraphStore {
    /// 새 어댑터를 생성합니다.
    ///
    /// `uri`는 스토어의 베이스 주소입니다 (예: `http://localhost:7474`).
    pub fn new(uri: &str, user: &str, password: &str, database: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/db/{}/tx/commit", uri.trim_end_matches('/'), database),
            user: user.to_owned(),
            password: password.to_owned(),
        }
    }

    /// 문장을 커밋하고 응답을 파싱합니다.
    async fn commit(&self, query: &str, params: Params) -> Result<CommitResponse, StorageError> {
        let body = serde_json::json!({
            "statements": [{
                "statement": query,
                "parameters": params,
                "resultDataContents": ["row", "graph"],
            }]
        });
        trace!(endpoint = self.endpoint.as_str(), query, "committing statement");

        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.user, Some(&self.password))
            .json(&body)
            .send()
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;

        response
            .json::<CommitResponse>()
            .await
            .map_err(|e| StorageError::Unavailable(format!("malformed server response: {e}")))
    }
}

#[async_trait]
impl GraphStore for HttpGraphStore {
    async fn execute_query(&self, query: &str, params: Params) -> Result<Vec<Row>, StorageError> {
        let response = self.commit(query, params).await?;
        if let Some(error) = response.errors.first() {
            return Err(StorageError::QueryFailed(format!(
                "{}: {}",
                error.code, error.message
            )));
        }
        Ok(response
            .results
            .first()
            .map(translate_result)
            .unwrap_or_default())
    }

    async fn execute_write(&self, query: &str, params: Params) -> Result<(), StorageError> {
        let response = self.commit(query, params).await?;
        if let Some(error) = response.errors.first() {
            return Err(StorageError::WriteFailed {
                statement: query.to_owned(),
                reason: format!("{}: {}", error.code, error.message),
            });
        }
        Ok(())
    }
}

// --- 서버 응답 스키마 ---

#[derive(Debug, Deserialize)]
struct CommitResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<ServerError>,
}

#[derive(Debug, Deserialize)]
struct ServerError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<DataEntry>,
}

#[derive(Debug, Deserialize)]
struct DataEntry {
    #[serde(default)]
    row: Vec<serde_json::Value>,
    #[serde(default)]
    meta: Vec<serde_json::Value>,
    #[serde(default)]
    graph: GraphSection,
}

#[derive(Debug, Default, Deserialize)]
struct GraphSection {
    #[serde(default)]
    nodes: Vec<GraphNode>,
    #[serde(default)]
    relationships: Vec<GraphRelationship>,
}

#[derive(Debug, Deserialize)]
struct GraphNode {
    id: String,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    properties: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct GraphRelationship {
    id: String,
    #[serde(rename = "type")]
    rel_type: String,
    #[serde(rename = "startNode")]
    start_node: String,
    #[serde(rename = "endNode")]
    end_node: String,
    #[serde(default)]
    properties: serde_json::Map<String, serde_json::Value>,
}

/// 문장 결과를 결과 행으로 변환합니다.
///
/// 각 열의 `meta` 항목이 노드/관계를 가리키면 `graph` 섹션에서 해당 id를
/// 찾아 레이블/타입을 복원하고, 그 외의 값은 스칼라로 남깁니다.
fn translate_result(result: &StatementResult) -> Vec<Row> {
    result
        .data
        .iter()
        .map(|entry| {
            let mut row = Row::new();
            for (index, column) in result.columns.iter().enumerate() {
                let value = translate_column(entry, index);
                row.push(column.clone(), value);
            }
            row
        })
        .collect()
}

fn translate_column(entry: &DataEntry, index: usize) -> ResultValue {
    let scalar = entry
        .row
        .get(index)
        .cloned()
        .unwrap_or(serde_json::Value::Null);
    let Some(meta) = entry.meta.get(index).and_then(|m| m.as_object()) else {
        return ResultValue::Scalar(scalar);
    };
    let meta_id = meta.get("id").and_then(|v| v.as_u64()).map(|v| v.to_string());
    let meta_type = meta.get("type").and_then(|v| v.as_str());

    match (meta_id, meta_type) {
        (Some(id), Some("node")) => {
            let Some(node) = entry.graph.nodes.iter().find(|n| n.id == id) else {
                return ResultValue::Scalar(scalar);
            };
            ResultValue::Node {
                id: node.id.clone(),
                labels: node.labels.clone(),
                properties: property_map_from_json(&node.properties),
            }
        }
        (Some(id), Some("relationship")) => {
            let Some(rel) = entry.graph.relationships.iter().find(|r| r.id == id) else {
                return ResultValue::Scalar(scalar);
            };
            ResultValue::Relationship {
                id: rel.id.clone(),
                rel_type: rel.rel_type.clone(),
                start_id: rel.start_node.clone(),
                end_id: rel.end_node.clone(),
                properties: property_map_from_json(&rel.properties),
            }
        }
        _ => ResultValue::Scalar(scalar),
    }
}
