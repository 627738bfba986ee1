//! Graphwatch 탐지 크레이트 — 규칙 레지스트리, 로더, 실행기
//!
//! # 모듈 구성
//!
//! - [`registry`]: 규칙의 insert-or-replace 레지스트리
//! - [`loader`]: JSON 규칙 파일 로딩 및 배치 검증
//! - [`executor`]: 규칙 쿼리 실행과 결과 행의 알림 축약
//!
//! 규칙 쿼리는 이 크레이트에서 절대 파싱하지 않는 불투명 문자열이며,
//! `GraphStore` 포트로 그대로 전달됩니다. 규칙 하나의 실패는 해당 규칙에만
//! 국한되고 배치 실행을 중단시키지 않습니다.

pub mod executor;
pub mod loader;
pub mod registry;

pub use executor::{RuleExecutor, RuleFailure, RunReport};
pub use loader::RuleLoader;
pub use registry::RuleRegistry;
