//! Alert Store — 알림 노드 저장 및 조회
//!
//! 탐지 알림을 그래프에 물질화합니다. 알림 노드는 `Alert` 레이블을 가지며,
//! 연루 엔티티와는 `INVOLVES` 관계로 연결됩니다. 엔티티는 인제스트가 기록한
//! 정체성 규약(타입 레이블 + `id` 속성)으로 매칭됩니다.

use std::sync::Arc;

use graphwatch_core::error::StorageError;
use graphwatch_core::metrics::DETECTION_ALERTS_STORED_TOTAL;
use graphwatch_core::store::{GraphStore, Params, single_param};
use graphwatch_core::types::{Alert, AlertEntity, PropertyMap, PropertyValue, ResultValue, property_map_to_json};
use tracing::{debug, warn};

use crate::cypher;
use crate::entity;

/// 알림 목록 조회 필터
#[derive(Debug, Clone)]
pub struct AlertFilter {
    /// 심각도 일치 필터
    pub severity: Option<u8>,
    /// 규칙 ID 일치 필터
    pub rule_id: Option<String>,
    /// 최대 반환 개수
    pub limit: usize,
}

impl Default for AlertFilter {
    fn default() -> Self {
        Self {
            severity: None,
            rule_id: None,
            limit: 100,
        }
    }
}

/// 알림 저장소
pub struct AlertStore {
    store: Arc<dyn GraphStore>,
}

impl AlertStore {
    /// 새 알림 저장소를 생성합니다.
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// 알림을 그래프에 기록합니다.
    ///
    /// 알림 노드 쓰기가 성공하면 `true`를 반환합니다. 개별 엔티티 연결
    /// 실패는 경고로만 남기며 저장 자체를 실패로 처리하지 않습니다.
    pub async fn store(&self, alert: &Alert) -> bool {
        let context =
            serde_json::Value::Object(property_map_to_json(&alert.context)).to_string();
        let mut params = Params::new();
        params.insert("alert_id".to_owned(), serde_json::json!(alert.alert_id));
        params.insert("rule_id".to_owned(), serde_json::json!(alert.rule_id));
        params.insert("timestamp".to_owned(), serde_json::json!(alert.timestamp));
        params.insert("severity".to_owned(), serde_json::json!(alert.severity));
        params.insert("context".to_owned(), serde_json::json!(context));

        if let Err(e) = self.store.execute_write(cypher::CREATE_ALERT, params).await {
            warn!(alert_id = alert.alert_id.as_str(), error = %e, "failed to store alert");
            return false;
        }
        metrics::counter!(DETECTION_ALERTS_STORED_TOTAL).increment(1);
        debug!(
            alert_id = alert.alert_id.as_str(),
            entities = alert.entities.len(),
            "alert stored"
        );

        for entity in &alert.entities {
            if let Err(e) = entity::validate_label(&entity.entity_type) {
                warn!(
                    alert_id = alert.alert_id.as_str(),
                    entity_id = entity.id.as_str(),
                    error = %e,
                    "invalid entity type label, skipping link"
                );
                continue;
            }
            let mut params = Params::new();
            params.insert("alert_id".to_owned(), serde_json::json!(alert.alert_id));
            params.insert("entity_id".to_owned(), serde_json::json!(entity.id));
            let statement = cypher::link_alert_entity(&entity.entity_type);
            if let Err(e) = self.store.execute_write(&statement, params).await {
                warn!(
                    alert_id = alert.alert_id.as_str(),
                    entity_id = entity.id.as_str(),
                    error = %e,
                    "failed to link alert entity"
                );
            }
        }
        true
    }

    /// 필터에 맞는 알림을 최신순으로 조회합니다.
    ///
    /// 각 알림의 연루 엔티티를 함께 해석합니다. 엔티티 표시 타입은
    /// 레이블 -> `type` 속성 -> `entity_type` 속성 -> `"Unknown"` 순입니다.
    pub async fn list(&self, filter: &AlertFilter) -> Result<Vec<Alert>, StorageError> {
        let (query, params) =
            cypher::build_alert_listing(filter.severity, filter.rule_id.as_deref(), filter.limit);
        let rows = self.store.execute_query(&query, params).await?;

        let mut alerts = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(ResultValue::Node { properties, .. }) = row.get("a") else {
                continue;
            };
            let Some(alert) = alert_from_node(properties) else {
                warn!("alert node missing required properties, skipping");
                continue;
            };
            let entities = self.list_entities(&alert.alert_id).await?;
            alerts.push(Alert { entities, ..alert });
        }
        Ok(alerts)
    }

    /// 알림의 연루 엔티티를 조회합니다.
    async fn list_entities(&self, alert_id: &str) -> Result<Vec<AlertEntity>, StorageError> {
        let params = single_param("alert_id", serde_json::json!(alert_id));
        let rows = self
            .store
            .execute_query(cypher::LIST_ALERT_ENTITIES, params)
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| match row.get("e") {
                Some(ResultValue::Node {
                    labels, properties, ..
                }) => Some(AlertEntity::from_node(labels, properties)),
                _ => None,
            })
            .collect())
    }
}

/// 알림 노드 속성에서 알림을 복원합니다 (엔티티 제외).
fn alert_from_node(properties: &PropertyMap) -> Option<Alert> {
    let str_prop = |key: &str| match properties.get(key) {
        Some(PropertyValue::Str(s)) => Some(s.clone()),
        _ => None,
    };
    let severity = match properties.get("severity") {
        Some(PropertyValue::Num(n)) => *n as u8,
        _ => 0,
    };
    Some(Alert {
        alert_id: str_prop("alert_id")?,
        rule_id: str_prop("rule_id")?,
        timestamp: str_prop("timestamp").unwrap_or_default(),
        severity,
        entities: Vec::new(),
        context: PropertyMap::new(),
    })
}
