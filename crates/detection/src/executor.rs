//! 규칙 실행기
//!
//! 규칙의 불투명 쿼리를 `GraphStore` 포트로 실행하고, 결과 행을 알림으로
//! 축약합니다. 행 하나가 알림 하나입니다. 노드 형태의 열은 연루 엔티티가
//! 되고, 스칼라/관계 열은 버려집니다. 알림 심각도는 행 데이터와 무관하게
//! 규칙의 설정값을 그대로 복사합니다.

use std::sync::Arc;

use graphwatch_core::error::DetectionError;
use graphwatch_core::metrics::{
    DETECTION_ALERTS_TOTAL, DETECTION_RUNS_TOTAL, LABEL_RESULT, LABEL_RULE_ID,
};
use graphwatch_core::store::{GraphStore, Params};
use graphwatch_core::types::{Alert, AlertEntity, DetectionRule, ResultValue, Row};
use tracing::{debug, warn};

use crate::registry::RuleRegistry;

/// 규칙 하나의 실행 실패 기록
#[derive(Debug)]
pub struct RuleFailure {
    /// 실패한 규칙 ID
    pub rule_id: String,
    /// 실패 사유
    pub reason: String,
}

/// 실행 결과 보고서
///
/// 배치 실행에서 규칙 하나의 실패는 `failures`에 수집될 뿐
/// 다른 규칙의 알림 생성을 막지 않습니다.
#[derive(Debug, Default)]
pub struct RunReport {
    /// 생성된 알림 (규칙 순회 순서 유지)
    pub alerts: Vec<Alert>,
    /// 규칙별 실패 기록
    pub failures: Vec<RuleFailure>,
}

/// 규칙 실행기
pub struct RuleExecutor {
    store: Arc<dyn GraphStore>,
}

impl RuleExecutor {
    /// 새 실행기를 생성합니다.
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// 규칙을 실행합니다.
    ///
    /// - `Some(rule_id)`: 해당 규칙만 실행합니다. 비활성화된 규칙은 빈
    ///   보고서를 반환하고, 없는 규칙은 [`DetectionError::RuleNotFound`]
    ///   에러입니다.
    /// - `None`: 활성화된 모든 규칙을 실행합니다. 규칙별 실패는 수집만
    ///   하고 계속 진행합니다.
    pub async fn run(
        &self,
        registry: &RuleRegistry,
        rule_id: Option<&str>,
    ) -> Result<RunReport, DetectionError> {
        let mut report = RunReport::default();

        match rule_id {
            Some(rule_id) => {
                let rule = registry
                    .get(rule_id)
                    .ok_or_else(|| DetectionError::RuleNotFound(rule_id.to_owned()))?;
                if !rule.enabled {
                    debug!(rule_id, "rule disabled, skipping");
                    return Ok(report);
                }
                match self.execute_rule(rule).await {
                    Ok(alerts) => report.alerts.extend(alerts),
                    Err(e) => return Err(e),
                }
            }
            None => {
                for rule in registry.list(true, None) {
                    match self.execute_rule(rule).await {
                        Ok(alerts) => report.alerts.extend(alerts),
                        Err(e) => {
                            warn!(rule_id = rule.rule_id.as_str(), error = %e, "rule run failed");
                            report.failures.push(RuleFailure {
                                rule_id: rule.rule_id.clone(),
                                reason: e.to_string(),
                            });
                        }
                    }
                }
            }
        }
        Ok(report)
    }

    /// 규칙 하나를 실행하고 결과 행을 알림으로 축약합니다.
    async fn execute_rule(&self, rule: &DetectionRule) -> Result<Vec<Alert>, DetectionError> {
        let rows = match self.store.execute_query(&rule.query, Params::new()).await {
            Ok(rows) => {
                metrics::counter!(DETECTION_RUNS_TOTAL, LABEL_RESULT => "success").increment(1);
                rows
            }
            Err(e) => {
                metrics::counter!(DETECTION_RUNS_TOTAL, LABEL_RESULT => "failure").increment(1);
                return Err(DetectionError::QueryError {
                    rule_id: rule.rule_id.clone(),
                    reason: e.to_string(),
                });
            }
        };

        let alerts: Vec<Alert> = rows.iter().map(|row| reduce_row(rule, row)).collect();
        if !alerts.is_empty() {
            debug!(
                rule_id = rule.rule_id.as_str(),
                count = alerts.len(),
                "rule produced alerts"
            );
            metrics::counter!(DETECTION_ALERTS_TOTAL, LABEL_RULE_ID => rule.rule_id.clone())
                .increment(alerts.len() as u64);
        }
        Ok(alerts)
    }
}

/// 결과 행 하나를 알림 하나로 축약합니다.
///
/// 열 순서대로 노드를 엔티티로 변환합니다. 스칼라와 관계는 버려지며,
/// `context`는 빈 맵으로 남습니다.
fn reduce_row(rule: &DetectionRule, row: &Row) -> Alert {
    let entities = row
        .columns
        .iter()
        .filter_map(|(_, value)| match value {
            ResultValue::Node {
                labels, properties, ..
            } => Some(AlertEntity::from_node(labels, properties)),
            _ => None,
        })
        .collect();
    Alert::new(rule, entities)
}
