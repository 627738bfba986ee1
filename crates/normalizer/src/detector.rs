//! 소스 형식 감지기
//!
//! 원시 JSON 이벤트의 필드 시그니처를 검사하여 소스 형식을 판별합니다.
//! 감지 우선순위는 고정되어 있으며, 더 구체적인 시그니처가 먼저 평가됩니다:
//!
//! 1. `class_uid` + `category_uid` 둘 다 존재 -> `ocsf` (이미 정규화됨)
//! 2. `deviceVendor` / `deviceProduct` / `deviceVersion` 중 하나 -> `cef`
//! 3. `devname` / `devtime` / `devtype` 중 하나 -> `leef`
//! 4. `facility` / `severity` / `timestamp` / `hostname` 중 하나 -> `syslog`
//! 5. 그 외 -> `unknown`

/// OCSF 형식 이름
pub const FORMAT_OCSF: &str = "ocsf";
/// CEF 형식 이름
pub const FORMAT_CEF: &str = "cef";
/// LEEF 형식 이름
pub const FORMAT_LEEF: &str = "leef";
/// Syslog 형식 이름
pub const FORMAT_SYSLOG: &str = "syslog";
/// 알 수 없는 형식
pub const FORMAT_UNKNOWN: &str = "unknown";

/// CEF 시그니처 필드
const CEF_MARKERS: [&str; 3] = ["deviceVendor", "deviceProduct", "deviceVersion"];
/// LEEF 시그니처 필드
const LEEF_MARKERS: [&str; 3] = ["devname", "devtime", "devtype"];
/// Syslog 시그니처 필드
const SYSLOG_MARKERS: [&str; 4] = ["facility", "severity", "timestamp", "hostname"];

/// 원시 JSON 이벤트의 소스 형식을 감지합니다.
///
/// 오브젝트가 아닌 값은 항상 `unknown`입니다. 감지는 필드 존재 여부만
/// 검사하며 값의 내용은 보지 않습니다.
pub fn detect_format(raw: &serde_json::Value) -> &'static str {
    let Some(obj) = raw.as_object() else {
        return FORMAT_UNKNOWN;
    };

    if obj.contains_key("class_uid") && obj.contains_key("category_uid") {
        return FORMAT_OCSF;
    }
    if CEF_MARKERS.iter().any(|key| obj.contains_key(*key)) {
        return FORMAT_CEF;
    }
    if LEEF_MARKERS.iter().any(|key| obj.contains_key(*key)) {
        return FORMAT_LEEF;
    }
    if SYSLOG_MARKERS.iter().any(|key| obj.contains_key(*key)) {
        return FORMAT_SYSLOG;
    }
    FORMAT_UNKNOWN
}
