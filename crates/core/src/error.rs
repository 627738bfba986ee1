//! 에러 타입 — 도메인별 에러 정의

/// Graphwatch 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum GraphwatchError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 정규화(형식 매핑) 에러
    #[error("normalize error: {0}")]
    Normalize(#[from] NormalizeError),

    /// 그래프 스토리지 에러
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// 탐지 엔진 에러
    #[error("detection error: {0}")]
    Detection(#[from] DetectionError),

    /// 파이프라인 처리 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 정규화(형식 매핑) 에러
///
/// 정규화 실패는 인제스트를 중단시키지 않습니다 — 호출자는 경고를 남기고
/// 원본 이벤트를 그대로 통과시키는 best-effort 정책을 따릅니다.
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    /// 원시 이벤트가 JSON 오브젝트가 아님
    #[error("raw event is not a JSON object")]
    NotAnObject,

    /// 형식별 매핑 실패
    #[error("mapping failed for format '{format}': {reason}")]
    MappingFailed { format: String, reason: String },
}

/// 그래프 스토리지 에러
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// 스토어 연결/전송 실패 — 호출자의 재시도 정책에 맡기며 내부 재시도 없음
    #[error("graph store unavailable: {0}")]
    Unavailable(String),

    /// 스토어가 쓰기를 거부함 (제약 위반, 잘못된 문장)
    #[error("graph write failed: {reason} (statement: {statement})")]
    WriteFailed { statement: String, reason: String },

    /// 읽기 쿼리 실행 실패
    #[error("graph query failed: {0}")]
    QueryFailed(String),

    /// 레이블 위치에 삽입할 수 없는 엔티티 타입
    ///
    /// 레이블은 바인딩 파라미터가 될 수 없으므로 문자열 삽입 전에 검증됩니다.
    #[error("invalid entity type label: '{label}'")]
    InvalidLabel { label: String },
}

/// 탐지 엔진 에러
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    /// 참조한 규칙이 없음
    #[error("rule not found: {0}")]
    RuleNotFound(String),

    /// 규칙 쿼리가 유효하지 않거나 실행 중 실패 — 해당 규칙에만 국한됨
    #[error("query error in rule '{rule_id}': {reason}")]
    QueryError { rule_id: String, reason: String },

    /// 규칙 유효성 검증 실패
    #[error("rule validation error: rule '{rule_id}': {reason}")]
    RuleValidation { rule_id: String, reason: String },

    /// 규칙 파일 로딩 실패
    #[error("rule load error: {path}: {reason}")]
    RuleLoad { path: String, reason: String },
}

/// 파이프라인 처리 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 채널 전송 실패
    #[error("channel send failed: {0}")]
    ChannelSend(String),

    /// 채널 수신 실패
    #[error("channel receive failed: {0}")]
    ChannelRecv(String),

    /// 파이프라인 초기화 실패
    #[error("pipeline init failed: {0}")]
    InitFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_failed_display_includes_statement() {
        let err = StorageError::WriteFailed {
            statement: "CREATE (e:Event)".to_owned(),
            reason: "constraint violation".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("CREATE (e:Event)"));
        assert!(msg.contains("constraint violation"));
    }

    #[test]
    fn query_error_display_includes_rule_id() {
        let err = DetectionError::QueryError {
            rule_id: "RULE-1234".to_owned(),
            reason: "syntax error".to_owned(),
        };
        assert!(err.to_string().contains("RULE-1234"));
    }

    #[test]
    fn storage_error_converts_to_top_level() {
        let err: GraphwatchError = StorageError::Unavailable("connection refused".to_owned()).into();
        assert!(matches!(err, GraphwatchError::Storage(_)));
    }

    #[test]
    fn rule_not_found_display() {
        let err = DetectionError::RuleNotFound("RULE-0001".to_owned());
        assert!(err.to_string().contains("RULE-0001"));
    }
}
