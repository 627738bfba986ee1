//! LEEF (Log Event Extended Format) -> OCSF 매퍼
//!
//! `devname`/`devtime`/`devtype` 필드를 가진 구조화 LEEF 이벤트를
//! 정규화 이벤트로 변환합니다.

use graphwatch_core::error::NormalizeError;
use graphwatch_core::types::CanonicalEvent;

use super::{FormatMapper, RawObject, build_metadata, fragment_field, severity_field, string_field};

/// LEEF 매퍼의 OCSF 클래스 할당
const LEEF_CLASS_UID: &str = "0001";
const LEEF_CATEGORY_UID: &str = "0002";

/// LEEF -> OCSF 매퍼
pub struct LeefMapper;

impl FormatMapper for LeefMapper {
    fn format_name(&self) -> &'static str {
        "leef"
    }

    fn map(&self, raw: &RawObject) -> Result<CanonicalEvent, NormalizeError> {
        let product = string_field(raw, "devname").unwrap_or_else(|| "Unknown".to_owned());
        let vendor = string_field(raw, "devtype").unwrap_or_else(|| "Unknown".to_owned());

        Ok(CanonicalEvent {
            class_uid: LEEF_CLASS_UID.to_owned(),
            category_uid: LEEF_CATEGORY_UID.to_owned(),
            time: string_field(raw, "devtime").unwrap_or_default(),
            severity: severity_field(raw, "severity").unwrap_or(0),
            message: string_field(raw, "message").unwrap_or_default(),
            metadata: build_metadata(product, vendor),
            src: fragment_field(raw, &["src", "source"]),
            dst: fragment_field(raw, &["dst", "destination"]),
            principal: fragment_field(raw, &["principal", "actor"]),
        })
    }
}
