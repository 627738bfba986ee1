//! 도메인 타입 — 시스템 전역에서 사용되는 공통 타입
//!
//! 정규화된 보안 이벤트(OCSF 기반), 엔티티 조각, 탐지 규칙, 알림 등
//! 모든 모듈이 공유하는 데이터 구조를 정의합니다.

use std::collections::BTreeMap;
use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 키 순서가 보장되는 속성 맵
///
/// 이벤트/엔티티/알림 컨텍스트의 개방형 속성 집합을 표현합니다.
/// `BTreeMap`을 사용하므로 직렬화 결과가 항상 결정적입니다.
pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// 속성 값 — 닫힌 variant 집합
///
/// 개방형 속성 맵의 값으로 허용되는 타입을 제한하여
/// 병합(merge) 의미론을 명확하게 유지합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// null 값
    Null,
    /// 불리언
    Bool(bool),
    /// 숫자 (정수/실수 구분 없이 저장)
    Num(f64),
    /// 문자열
    Str(String),
    /// 중첩 맵
    Map(PropertyMap),
}

impl PropertyValue {
    /// JSON 값을 속성 값으로 변환합니다.
    ///
    /// 배열 등 닫힌 variant에 없는 형태는 JSON 문자열 렌더링으로 격하됩니다.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => Self::Num(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::String(s) => Self::Str(s.clone()),
            serde_json::Value::Object(map) => Self::Map(property_map_from_json(map)),
            other => Self::Str(other.to_string()),
        }
    }

    /// 속성 값을 JSON 값으로 되돌립니다.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Num(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::Str(s) => serde_json::Value::String(s.clone()),
            Self::Map(m) => serde_json::Value::Object(
                m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

/// JSON 오브젝트를 속성 맵으로 변환합니다.
pub fn property_map_from_json(map: &serde_json::Map<String, serde_json::Value>) -> PropertyMap {
    map.iter()
        .map(|(k, v)| (k.clone(), PropertyValue::from_json(v)))
        .collect()
}

/// 속성 맵을 JSON 오브젝트로 변환합니다.
pub fn property_map_to_json(map: &PropertyMap) -> serde_json::Map<String, serde_json::Value> {
    map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect()
}

fn default_unknown() -> String {
    "unknown".to_owned()
}

fn default_true() -> bool {
    true
}

/// 정규화 이벤트 (OCSF 기반 공통 스키마)
///
/// 모든 소스 형식(syslog, CEF, LEEF)은 Format Mapper를 거쳐
/// 이 구조로 수렴합니다. Graph Writer에 전달된 이후에는 불변입니다.
///
/// `class_uid`/`category_uid`는 항상 존재하며, 소스 형식이 값을 주지
/// 않으면 `"unknown"`이 됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEvent {
    /// OCSF 이벤트 클래스 식별자
    #[serde(default = "default_unknown")]
    pub class_uid: String,
    /// OCSF 카테고리 식별자
    #[serde(default = "default_unknown")]
    pub category_uid: String,
    /// 이벤트 발생 시각 (ISO-8601 문자열)
    #[serde(default)]
    pub time: String,
    /// 심각도 (0-10)
    #[serde(default)]
    pub severity: u8,
    /// 이벤트 메시지
    #[serde(default)]
    pub message: String,
    /// 메타데이터 (스키마 버전, 제품/벤더명 등)
    #[serde(default)]
    pub metadata: PropertyMap,
    /// 출발지 엔티티 조각 (있을 경우)
    #[serde(default, alias = "source", skip_serializing_if = "Option::is_none")]
    pub src: Option<EntityFragment>,
    /// 목적지 엔티티 조각 (있을 경우)
    #[serde(default, alias = "destination", skip_serializing_if = "Option::is_none")]
    pub dst: Option<EntityFragment>,
    /// 행위자(principal) 엔티티 조각 (있을 경우)
    #[serde(default, alias = "actor", skip_serializing_if = "Option::is_none")]
    pub principal: Option<EntityFragment>,
}

impl CanonicalEvent {
    /// JSON 값에서 정규화 이벤트를 역직렬화합니다.
    ///
    /// 누락된 `class_uid`/`category_uid`는 `"unknown"`으로 채워집니다.
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// 이벤트를 JSON 값으로 직렬화합니다.
    pub fn to_value(&self) -> serde_json::Value {
        // 필드가 모두 직렬화 가능하므로 실패하지 않습니다.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Default for CanonicalEvent {
    fn default() -> Self {
        Self {
            class_uid: default_unknown(),
            category_uid: default_unknown(),
            time: String::new(),
            severity: 0,
            message: String::new(),
            metadata: PropertyMap::new(),
            src: None,
            dst: None,
            principal: None,
        }
    }
}

impl fmt::Display for CanonicalEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}/{}] sev={} {}",
            self.class_uid, self.category_uid, self.severity, self.message,
        )
    }
}

/// 엔티티 조각 — 이벤트에 포함된 엔티티 참조
///
/// 정규화 이벤트에서 일시적으로 파생되며, 그래프에 병합될 때
/// `(entity_type, identity_key)` 쌍으로 노드 정체성이 결정됩니다.
/// `type`/`id` 외의 모든 필드는 `properties`로 수집됩니다.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityFragment {
    /// 엔티티 타입 레이블 (IP, User, Host 등)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    /// 명시적 자연 식별자 (없으면 속성 해시로 대체)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// 개방형 속성 집합 (type/id 제외)
    #[serde(flatten)]
    pub properties: PropertyMap,
}

/// 탐지 규칙
///
/// 선언적 Cypher 쿼리와 메타데이터의 묶음입니다.
/// `query`는 코어에서 절대 파싱하지 않는 불투명 문자열이며,
/// 그래프 스토어로 그대로 전달됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRule {
    /// 규칙 고유 ID (비어 있으면 로드 시 서버가 생성)
    #[serde(default)]
    pub rule_id: String,
    /// 규칙 이름
    pub name: String,
    /// 규칙 설명
    #[serde(default)]
    pub description: String,
    /// 심각도 (1-10)
    pub severity: u8,
    /// 탐지 쿼리 (불투명 Cypher 문자열)
    pub query: String,
    /// 분류 태그
    #[serde(default)]
    pub tags: Vec<String>,
    /// MITRE ATT&CK 기법 ID 목록
    #[serde(default)]
    pub mitre_techniques: Vec<String>,
    /// 활성화 여부
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl DetectionRule {
    /// 규칙의 유효성을 검증합니다.
    ///
    /// `rule_id`는 비어 있어도 됩니다 (로드 시 생성).
    pub fn validate(&self) -> Result<(), crate::error::DetectionError> {
        if self.name.is_empty() {
            return Err(crate::error::DetectionError::RuleValidation {
                rule_id: self.rule_id.clone(),
                reason: "rule name must not be empty".to_owned(),
            });
        }
        if self.query.trim().is_empty() {
            return Err(crate::error::DetectionError::RuleValidation {
                rule_id: self.rule_id.clone(),
                reason: "rule query must not be empty".to_owned(),
            });
        }
        if !(1..=10).contains(&self.severity) {
            return Err(crate::error::DetectionError::RuleValidation {
                rule_id: self.rule_id.clone(),
                reason: format!("severity {} out of range (1-10)", self.severity),
            });
        }
        Ok(())
    }

    /// 새 규칙 ID를 생성합니다 (`RULE-` + uuid 앞 8자리).
    pub fn generate_id() -> String {
        let uuid = Uuid::new_v4().to_string();
        format!("RULE-{}", &uuid[..8])
    }
}

impl fmt::Display for DetectionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} '{}' sev={} enabled={}",
            self.rule_id, self.name, self.severity, self.enabled,
        )
    }
}

/// 알림에 연루된 엔티티 참조
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEntity {
    /// 엔티티 타입 (그래프 레이블 기준)
    #[serde(rename = "type")]
    pub entity_type: String,
    /// 엔티티 식별자
    pub id: String,
    /// 엔티티 속성 (id/type 계열 필드 제외)
    #[serde(default)]
    pub properties: PropertyMap,
}

impl AlertEntity {
    /// 그래프 노드에서 알림 엔티티를 만듭니다.
    ///
    /// 표시 타입은 레이블 -> `type` 속성 -> `entity_type` 속성 -> `"Unknown"`
    /// 순으로 결정됩니다. `id`/`type`/`entity_type` 필드는 속성에서 제외됩니다.
    pub fn from_node(labels: &[String], properties: &PropertyMap) -> Self {
        let str_prop = |key: &str| match properties.get(key) {
            Some(PropertyValue::Str(s)) => Some(s.clone()),
            _ => None,
        };
        let entity_type = labels
            .first()
            .cloned()
            .or_else(|| str_prop("type"))
            .or_else(|| str_prop("entity_type"))
            .unwrap_or_else(|| "Unknown".to_owned());
        let id = str_prop("id").unwrap_or_else(|| "unknown".to_owned());
        let properties = properties
            .iter()
            .filter(|(key, _)| !matches!(key.as_str(), "id" | "type" | "entity_type"))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Self {
            entity_type,
            id,
            properties,
        }
    }
}

/// 탐지 알림
///
/// Rule Executor가 쿼리 결과 행 하나당 하나씩 생성합니다.
/// 생성 후에는 불변이며, Alert Materializer가 그래프에 기록합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// 알림 고유 ID
    pub alert_id: String,
    /// 알림을 생성한 규칙 ID
    pub rule_id: String,
    /// 생성 시각 (ISO-8601)
    pub timestamp: String,
    /// 심각도 — 규칙의 설정값 그대로 (행 데이터에서 재계산하지 않음)
    pub severity: u8,
    /// 연루된 엔티티 목록 (행에서 추출된 순서 유지)
    pub entities: Vec<AlertEntity>,
    /// 추가 컨텍스트 (기본 빈 맵)
    #[serde(default)]
    pub context: PropertyMap,
}

impl Alert {
    /// 규칙과 엔티티 목록에서 새 알림을 생성합니다.
    pub fn new(rule: &DetectionRule, entities: Vec<AlertEntity>) -> Self {
        let uuid = Uuid::new_v4().to_string();
        Self {
            alert_id: format!("ALERT-{}", &uuid[..8]),
            rule_id: rule.rule_id.clone(),
            timestamp: Utc::now().to_rfc3339(),
            severity: rule.severity,
            entities,
            context: PropertyMap::new(),
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (rule: {}, sev={}, entities={})",
            self.alert_id,
            self.rule_id,
            self.severity,
            self.entities.len(),
        )
    }
}

/// 쿼리 결과 값 — 노드/관계/스칼라 tagged variant
///
/// 그래프 스토어 어댑터가 결과 열의 형태를 판별하여 생성합니다.
/// Rule Executor의 축약 로직은 이 variant에 대한 순수 함수입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResultValue {
    /// 그래프 노드
    Node {
        /// 스토어 내부 노드 ID
        id: String,
        /// 노드 레이블 목록
        labels: Vec<String>,
        /// 노드 속성
        properties: PropertyMap,
    },
    /// 그래프 관계
    Relationship {
        /// 스토어 내부 관계 ID
        id: String,
        /// 관계 타입 (GENERATED, TARGETS 등)
        rel_type: String,
        /// 시작 노드 ID
        start_id: String,
        /// 끝 노드 ID
        end_id: String,
        /// 관계 속성
        properties: PropertyMap,
    },
    /// 스칼라 값 (노드/관계가 아닌 모든 것)
    Scalar(serde_json::Value),
}

impl ResultValue {
    /// 노드 값인지 여부
    pub fn is_node(&self) -> bool {
        matches!(self, Self::Node { .. })
    }

    /// 관계 값인지 여부
    pub fn is_relationship(&self) -> bool {
        matches!(self, Self::Relationship { .. })
    }
}

/// 쿼리 결과 행 — 열 이름과 값의 순서 있는 목록
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// (열 이름, 값) 쌍 — 쿼리의 RETURN 순서를 유지합니다.
    pub columns: Vec<(String, ResultValue)>,
}

impl Row {
    /// 빈 행을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 열을 추가합니다.
    pub fn push(&mut self, name: impl Into<String>, value: ResultValue) {
        self.columns.push((name.into(), value));
    }

    /// 이름으로 열 값을 조회합니다.
    pub fn get(&self, name: &str) -> Option<&ResultValue> {
        self.columns
            .iter()
            .find(|(col, _)| col == name)
            .map(|(_, value)| value)
    }
}
