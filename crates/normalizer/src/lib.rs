//! Graphwatch 정규화 크레이트 — 소스 형식 감지 및 OCSF 매핑
//!
//! # 모듈 구성
//!
//! - [`detector`]: 원시 JSON 이벤트의 소스 형식 자동 감지 (ocsf, cef, leef, syslog)
//! - [`mapper`]: 형식별 OCSF 매퍼 및 라우터 ([`Normalizer`])
//!
//! # 파이프라인 위치
//!
//! ```text
//! Queue Consumer -> detect_format -> Normalizer -> CanonicalEvent -> Graph Writer
//! ```
//!
//! 정규화는 best-effort입니다. 알 수 없는 형식은 경고와 함께 passthrough
//! 처리되며, 인제스트를 중단시키지 않습니다.

pub mod detector;
pub mod mapper;

pub use detector::detect_format;
pub use mapper::{CefMapper, FormatMapper, LeefMapper, Normalizer, SyslogMapper};
