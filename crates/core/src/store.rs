//! 그래프 스토어 포트 — 모듈 확장 포인트 정의
//!
//! 코어는 쿼리 언어를 파싱하지 않습니다. 모든 읽기/쓰기는
//! 불투명 쿼리 문자열과 이름 있는 파라미터로 표현되며,
//! 실제 실행은 이 trait을 구현한 백엔드가 담당합니다.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::types::Row;

/// 쿼리의 이름 있는 파라미터 집합
pub type Params = serde_json::Map<String, serde_json::Value>;

/// 그래프 스토어 포트
///
/// 새로운 스토어 백엔드를 지원하려면 이 trait을 구현합니다.
/// 구현체는 스토어 자체의 트랜잭션 격리에 의존하며,
/// 코어는 프로세스 내 잠금을 추가하지 않습니다.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// 읽기 쿼리를 실행하고 결과 행을 반환합니다.
    ///
    /// 각 행은 열 이름에서 노드/관계/스칼라 값으로의 순서 있는 매핑입니다.
    async fn execute_query(&self, query: &str, params: Params) -> Result<Vec<Row>, StorageError>;

    /// 쓰기 전용 문장을 실행합니다.
    async fn execute_write(&self, query: &str, params: Params) -> Result<(), StorageError>;
}

/// 단일 파라미터로 `Params`를 만드는 헬퍼입니다.
pub fn single_param(key: &str, value: serde_json::Value) -> Params {
    let mut params = Params::new();
    params.insert(key.to_owned(), value);
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_param_builds_map() {
        let params = single_param("event_id", serde_json::json!("42"));
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("event_id"), Some(&serde_json::json!("42")));
    }
}
