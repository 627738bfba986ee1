//! Graphwatch 그래프 크레이트 — 엔티티 해석, 그래프 쓰기, 알림 저장
//!
//! # 모듈 구성
//!
//! - [`entity`]: 엔티티 조각의 정체성 해석 (명시적 id 또는 결정적 내용 해시)
//! - [`cypher`]: Graph Writer가 사용하는 파라미터화 문장 템플릿
//! - [`writer`]: 정규화 이벤트를 이벤트 노드 + 엔티티 병합 + 관계로 기록
//! - [`alerts`]: 알림 노드 저장 및 조회
//! - [`store`]: `GraphStore` 포트 구현 (HTTP 어댑터, 인메모리 백엔드)
//!
//! # 쓰기 경로
//!
//! ```text
//! CanonicalEvent -> GraphWriter -> CREATE (e:Event ...)
//!                               -> MERGE (s:IP {id}) -[:GENERATED]-> (e)
//!                               -> (e) -[:TARGETS]-> MERGE (d:Host {id})
//!                               -> MERGE (p:User {id}) -[:PERFORMED]-> (e)
//! ```

pub mod alerts;
pub mod cypher;
pub mod entity;
pub mod store;
pub mod writer;

pub use alerts::{AlertFilter, AlertStore};
pub use entity::ResolvedEntity;
pub use store::http::HttpGraphStore;
pub use store::memory::MemoryGraphStore;
pub use writer::{EventDedupPolicy, GraphWriter};
