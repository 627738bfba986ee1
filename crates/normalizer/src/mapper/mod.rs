//! 형식별 OCSF 매퍼 및 정규화 라우터
//!
//! [`Normalizer`]는 원시 JSON 이벤트의 형식을 판별하여 적절한 매퍼를 선택합니다.
//! 각 매퍼는 [`FormatMapper`] trait을 구현합니다.
//!
//! # 지원 형식
//! - Syslog ([`SyslogMapper`])
//! - CEF ([`CefMapper`])
//! - LEEF ([`LeefMapper`])
//! - OCSF는 매퍼 없이 검증 passthrough로 처리됩니다.
//!
//! # 사용 예시
//! ```
//! use graphwatch_normalizer::Normalizer;
//!
//! let normalizer = Normalizer::with_defaults();
//! let raw = serde_json::json!({
//!     "severity": 3,
//!     "hostname": "fw-01",
//!     "message": "connection refused"
//! });
//! let event = normalizer.normalize(&raw, None).unwrap();
//! assert_eq!(event.severity, 7);
//! ```

pub mod cef;
pub mod leef;
pub mod syslog;

pub use cef::CefMapper;
pub use leef::LeefMapper;
pub use syslog::SyslogMapper;

use graphwatch_core::error::NormalizeError;
use graphwatch_core::metrics::NORMALIZE_FALLBACK_TOTAL;
use graphwatch_core::types::{CanonicalEvent, EntityFragment, PropertyMap, PropertyValue};
use tracing::warn;

use crate::detector::{FORMAT_OCSF, detect_format};

/// 모든 매퍼가 기록하는 OCSF 스키마 버전
pub(crate) const SCHEMA_VERSION: &str = "1.0.0";

/// 원시 JSON 오브젝트 타입 별칭
pub type RawObject = serde_json::Map<String, serde_json::Value>;

/// 형식별 OCSF 매퍼 trait
///
/// 새로운 소스 형식을 지원하려면 이 trait을 구현하고
/// [`Normalizer::register`]로 등록합니다.
pub trait FormatMapper: Send + Sync {
    /// 매퍼가 담당하는 형식 이름 (detector의 형식 이름과 일치)
    fn format_name(&self) -> &'static str;

    /// 원시 이벤트를 정규화 이벤트로 변환합니다.
    fn map(&self, raw: &RawObject) -> Result<CanonicalEvent, NormalizeError>;
}

/// 정규화 라우터 -- 형식을 판별하여 적절한 매퍼로 라우팅합니다.
///
/// 알 수 없는 형식은 에러가 아닙니다. 경고를 남기고 원본 이벤트를
/// best-effort로 통과시키며 `graphwatch_normalize_fallback_total`을
/// 증가시킵니다.
pub struct Normalizer {
    /// 등록된 매퍼 목록
    mappers: Vec<Box<dyn FormatMapper>>,
}

impl Normalizer {
    /// 매퍼가 없는 빈 라우터를 생성합니다.
    pub fn new() -> Self {
        Self {
            mappers: Vec::new(),
        }
    }

    /// 기본 매퍼 세트 (Syslog + CEF + LEEF)로 라우터를 생성합니다.
    pub fn with_defaults() -> Self {
        Self::new()
            .register(Box::new(SyslogMapper))
            .register(Box::new(CefMapper))
            .register(Box::new(LeefMapper))
    }

    /// 매퍼를 등록합니다.
    pub fn register(mut self, mapper: Box<dyn FormatMapper>) -> Self {
        self.mappers.push(mapper);
        self
    }

    /// 원시 JSON 이벤트를 정규화합니다.
    ///
    /// `declared_format`이 주어지면 감지를 건너뛰고 해당 형식으로 처리하며,
    /// `None`이면 [`detect_format`]으로 형식을 판별합니다.
    ///
    /// # Errors
    ///
    /// 원시 값이 JSON 오브젝트가 아니거나, OCSF passthrough 역직렬화가
    /// 실패한 경우에만 에러를 반환합니다.
    pub fn normalize(
        &self,
        raw: &serde_json::Value,
        declared_format: Option<&str>,
    ) -> Result<CanonicalEvent, NormalizeError> {
        let obj = raw.as_object().ok_or(NormalizeError::NotAnObject)?;
        let format = match declared_format {
            Some(declared) => declared,
            None => detect_format(raw),
        };

        if format == FORMAT_OCSF {
            return CanonicalEvent::from_value(raw.clone()).map_err(|e| {
                NormalizeError::MappingFailed {
                    format: FORMAT_OCSF.to_owned(),
                    reason: e.to_string(),
                }
            });
        }

        for mapper in &self.mappers {
            if mapper.format_name() == format {
                return mapper.map(obj);
            }
        }

        warn!(format, "unrecognized source format, passing event through");
        metrics::counter!(NORMALIZE_FALLBACK_TOTAL).increment(1);
        Ok(Self::passthrough(raw))
    }

    /// 알 수 없는 형식의 이벤트를 best-effort로 통과시킵니다.
    ///
    /// 정규화 스키마로 역직렬화를 시도하고, 실패하면 원본 JSON 렌더링을
    /// 메시지로 담은 기본 이벤트를 만듭니다.
    fn passthrough(raw: &serde_json::Value) -> CanonicalEvent {
        CanonicalEvent::from_value(raw.clone()).unwrap_or_else(|_| CanonicalEvent {
            message: raw.to_string(),
            ..CanonicalEvent::default()
        })
    }

    /// 등록된 매퍼 형식 이름 목록을 반환합니다.
    pub fn registered_formats(&self) -> Vec<&str> {
        self.mappers.iter().map(|m| m.format_name()).collect()
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// --- 매퍼 공용 헬퍼 ---

/// 문자열 또는 숫자 필드를 문자열로 추출합니다.
pub(crate) fn string_field(obj: &RawObject, key: &str) -> Option<String> {
    match obj.get(key) {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// 심각도 필드를 0-10 범위의 u8로 추출합니다.
///
/// 숫자 또는 숫자 문자열을 허용하며, 범위를 벗어난 값은 클램핑됩니다.
pub(crate) fn severity_field(obj: &RawObject, key: &str) -> Option<u8> {
    let num = match obj.get(key)? {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    Some(num.clamp(0.0, 10.0).round() as u8)
}

/// 후보 키 목록에서 첫 번째로 존재하는 엔티티 조각을 추출합니다.
///
/// `type`/`id` 외의 필드는 모두 속성으로 수집되며, 배열 등 닫힌
/// variant에 없는 값은 JSON 문자열로 격하됩니다.
pub(crate) fn fragment_field(obj: &RawObject, keys: &[&str]) -> Option<EntityFragment> {
    for key in keys {
        if let Some(value) = obj.get(*key) {
            if let Some(fragment) = fragment_from_json(value) {
                return Some(fragment);
            }
        }
    }
    None
}

/// JSON 오브젝트에서 엔티티 조각을 만듭니다.
fn fragment_from_json(value: &serde_json::Value) -> Option<EntityFragment> {
    let obj = value.as_object()?;
    let mut fragment = EntityFragment::default();
    let mut properties = PropertyMap::new();
    for (key, val) in obj {
        match key.as_str() {
            "type" => fragment.entity_type = val.as_str().map(str::to_owned),
            "id" => fragment.id = val.as_str().map(str::to_owned),
            _ => {
                properties.insert(key.clone(), PropertyValue::from_json(val));
            }
        }
    }
    fragment.properties = properties;
    Some(fragment)
}

/// `metadata` 속성 맵을 만듭니다 (schema version + product 정보).
pub(crate) fn build_metadata(product_name: String, vendor_name: String) -> PropertyMap {
    let mut product = PropertyMap::new();
    product.insert("name".to_owned(), PropertyValue::Str(product_name));
    product.insert("vendor_name".to_owned(), PropertyValue::Str(vendor_name));

    let mut metadata = PropertyMap::new();
    metadata.insert(
        "version".to_owned(),
        PropertyValue::Str(SCHEMA_VERSION.to_owned()),
    );
    metadata.insert("product".to_owned(), PropertyValue::Map(product));
    metadata
}
