//! 규칙 레지스트리
//!
//! 탐지 규칙의 메모리 내 저장소입니다. 같은 `rule_id`로 다시 로드하면
//! 기존 규칙을 교체합니다 (insert-or-replace).
//!
//! 내부 동기화는 하지 않습니다. 여러 태스크에서 공유하려면 호출자가
//! `RwLock` 등으로 감쌉니다.

use std::collections::BTreeMap;

use graphwatch_core::error::DetectionError;
use graphwatch_core::metrics::DETECTION_RULES_LOADED;
use graphwatch_core::types::DetectionRule;
use tracing::info;

/// 탐지 규칙 레지스트리
#[derive(Debug, Default)]
pub struct RuleRegistry {
    /// rule_id로 정렬된 규칙 맵 (목록 순서 결정적)
    rules: BTreeMap<String, DetectionRule>,
}

impl RuleRegistry {
    /// 빈 레지스트리를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 규칙을 검증 후 등록하고 규칙 ID를 반환합니다.
    ///
    /// `rule_id`가 비어 있으면 `RULE-{uuid8}` 형식의 새 ID를 생성합니다.
    /// 이미 있는 ID는 교체됩니다.
    ///
    /// # Errors
    ///
    /// 규칙 유효성 검증이 실패하면 [`DetectionError::RuleValidation`]을
    /// 반환합니다.
    pub fn load(&mut self, mut rule: DetectionRule) -> Result<String, DetectionError> {
        rule.validate()?;
        if rule.rule_id.is_empty() {
            rule.rule_id = DetectionRule::generate_id();
        }
        let rule_id = rule.rule_id.clone();
        let replaced = self.rules.insert(rule_id.clone(), rule).is_some();
        info!(rule_id = rule_id.as_str(), replaced, "rule loaded");
        metrics::gauge!(DETECTION_RULES_LOADED).set(self.rules.len() as f64);
        Ok(rule_id)
    }

    /// 규칙 배치를 등록하고 할당된 ID 목록을 반환합니다.
    ///
    /// 첫 번째 검증 실패에서 중단하며, 그 앞의 규칙은 이미 등록된
    /// 상태로 남습니다.
    pub fn load_bulk(
        &mut self,
        rules: Vec<DetectionRule>,
    ) -> Result<Vec<String>, DetectionError> {
        let mut ids = Vec::with_capacity(rules.len());
        for rule in rules {
            ids.push(self.load(rule)?);
        }
        Ok(ids)
    }

    /// 규칙을 조회합니다.
    pub fn get(&self, rule_id: &str) -> Option<&DetectionRule> {
        self.rules.get(rule_id)
    }

    /// 규칙을 제거하고 반환합니다.
    ///
    /// # Errors
    ///
    /// 규칙이 없으면 [`DetectionError::RuleNotFound`]를 반환합니다.
    pub fn remove(&mut self, rule_id: &str) -> Result<DetectionRule, DetectionError> {
        let removed = self
            .rules
            .remove(rule_id)
            .ok_or_else(|| DetectionError::RuleNotFound(rule_id.to_owned()))?;
        metrics::gauge!(DETECTION_RULES_LOADED).set(self.rules.len() as f64);
        Ok(removed)
    }

    /// 규칙 목록을 반환합니다.
    ///
    /// `enabled_only`가 true면 활성화된 규칙만, `tag`가 주어지면 해당
    /// 태그를 가진 규칙만 반환합니다.
    pub fn list(&self, enabled_only: bool, tag: Option<&str>) -> Vec<&DetectionRule> {
        self.rules
            .values()
            .filter(|rule| !enabled_only || rule.enabled)
            .filter(|rule| match tag {
                Some(tag) => rule.tags.iter().any(|t| t == tag),
                None => true,
            })
            .collect()
    }

    /// 등록된 규칙 수
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}
