//! `GraphStore` 포트 구현
//!
//! - [`http`]: Neo4j HTTP 트랜잭션 커밋 프로토콜 어댑터
//! - [`memory`]: 테스트/로컬 실행용 인메모리 백엔드

pub mod http;
pub mod memory;
