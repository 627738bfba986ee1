//! Syslog -> OCSF 매퍼
//!
//! 큐로 들어온 구조화 syslog 이벤트 (`facility`/`severity`/`timestamp`/
//! `hostname` 필드를 가진 JSON 오브젝트)를 정규화 이벤트로 변환합니다.
//!
//! # 심각도 재매핑
//!
//! Syslog 심각도(0-7, 낮을수록 위험)는 OCSF 심각도(0-10, 높을수록 위험)와
//! 방향이 반대이므로 고정 테이블로 재매핑합니다:
//!
//! | syslog | OCSF |
//! |--------|------|
//! | 0 Emergency | 10 |
//! | 1 Alert | 9 |
//! | 2 Critical | 8 |
//! | 3 Error | 7 |
//! | 4 Warning | 6 |
//! | 5 Notice | 5 |
//! | 6 Informational | 4 |
//! | 7 Debug | 3 |
//!
//! 범위를 벗어난 값은 5로 처리합니다.

use graphwatch_core::error::NormalizeError;
use graphwatch_core::types::CanonicalEvent;

use super::{FormatMapper, RawObject, build_metadata, fragment_field, string_field};

/// Syslog 매퍼의 OCSF 클래스 할당
const SYSLOG_CLASS_UID: &str = "0001";
const SYSLOG_CATEGORY_UID: &str = "0002";

/// Syslog -> OCSF 매퍼
pub struct SyslogMapper;

impl SyslogMapper {
    /// syslog 심각도를 OCSF 심각도로 재매핑합니다.
    fn remap_severity(syslog_severity: u64) -> u8 {
        match syslog_severity {
            0 => 10,
            1 => 9,
            2 => 8,
            3 => 7,
            4 => 6,
            5 => 5,
            6 => 4,
            7 => 3,
            _ => 5,
        }
    }

    /// 원시 이벤트에서 syslog 심각도 값을 읽습니다.
    ///
    /// 누락되거나 숫자가 아니면 0 (Emergency)으로 간주합니다.
    fn raw_severity(obj: &RawObject) -> u64 {
        match obj.get("severity") {
            Some(serde_json::Value::Number(n)) => n.as_u64().unwrap_or(0),
            Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(0),
            _ => 0,
        }
    }
}

impl FormatMapper for SyslogMapper {
    fn format_name(&self) -> &'static str {
        "syslog"
    }

    fn map(&self, raw: &RawObject) -> Result<CanonicalEvent, NormalizeError> {
        let hostname = string_field(raw, "hostname").unwrap_or_else(|| "Unknown".to_owned());

        Ok(CanonicalEvent {
            class_uid: SYSLOG_CLASS_UID.to_owned(),
            category_uid: SYSLOG_CATEGORY_UID.to_owned(),
            time: string_field(raw, "timestamp").unwrap_or_default(),
            severity: Self::remap_severity(Self::raw_severity(raw)),
            message: string_field(raw, "message").unwrap_or_default(),
            metadata: build_metadata("Syslog".to_owned(), hostname),
            src: fragment_field(raw, &["src", "source"]),
            dst: fragment_field(raw, &["dst", "destination"]),
            principal: fragment_field(raw, &["principal", "actor"]),
        })
    }
}
