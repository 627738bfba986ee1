//! CEF (Common Event Format) -> OCSF 매퍼
//!
//! `deviceVendor`/`deviceProduct`/`deviceVersion` 필드를 가진 구조화 CEF
//! 이벤트를 정규화 이벤트로 변환합니다. CEF 심각도는 이미 0-10 스케일이므로
//! 재매핑 없이 클램핑만 적용합니다.

use graphwatch_core::error::NormalizeError;
use graphwatch_core::types::CanonicalEvent;

use super::{FormatMapper, RawObject, build_metadata, fragment_field, severity_field, string_field};

/// CEF 매퍼의 OCSF 클래스 할당
const CEF_CLASS_UID: &str = "0001";
const CEF_CATEGORY_UID: &str = "0002";

/// CEF -> OCSF 매퍼
pub struct CefMapper;

impl FormatMapper for CefMapper {
    fn format_name(&self) -> &'static str {
        "cef"
    }

    fn map(&self, raw: &RawObject) -> Result<CanonicalEvent, NormalizeError> {
        let product =
            string_field(raw, "deviceProduct").unwrap_or_else(|| "Unknown".to_owned());
        let vendor = string_field(raw, "deviceVendor").unwrap_or_else(|| "Unknown".to_owned());

        Ok(CanonicalEvent {
            class_uid: CEF_CLASS_UID.to_owned(),
            category_uid: CEF_CATEGORY_UID.to_owned(),
            time: string_field(raw, "deviceReceiptTime").unwrap_or_default(),
            severity: severity_field(raw, "severity").unwrap_or(0),
            message: string_field(raw, "message").unwrap_or_default(),
            metadata: build_metadata(product, vendor),
            src: fragment_field(raw, &["src", "source"]),
            dst: fragment_field(raw, &["dst", "destination"]),
            principal: fragment_field(raw, &["principal", "actor"]),
        })
    }
}
