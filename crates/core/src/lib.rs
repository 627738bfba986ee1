//! # graphwatch-core
//!
//! Graphwatch 전 모듈이 공유하는 기반 크레이트입니다.
//!
//! - [`types`]: 정규화 이벤트 모델, 엔티티/규칙/알림 도메인 타입
//! - [`store`]: 그래프 스토어 포트 (Cypher 문자열 + 파라미터 실행 인터페이스)
//! - [`error`]: 도메인별 에러 타입
//! - [`config`]: graphwatch.toml 설정 파싱 및 환경변수 오버라이드
//! - [`metrics`]: Prometheus 메트릭 이름 상수

pub mod config;
pub mod error;
pub mod metrics;
pub mod store;
pub mod types;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{
    ConfigError, DetectionError, GraphwatchError, NormalizeError, PipelineError, StorageError,
};

// 설정
pub use config::GraphwatchConfig;

// 그래프 스토어 포트
pub use store::{GraphStore, Params};

// 도메인 타입
pub use types::{
    Alert, AlertEntity, CanonicalEvent, DetectionRule, EntityFragment, PropertyMap, PropertyValue,
    ResultValue, Row,
};
