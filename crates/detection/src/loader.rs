//! 규칙 파일 로더
//!
//! 규칙 파일은 규칙 레코드의 JSON 배열입니다:
//!
//! ```json
//! [
//!   {
//!     "rule_id": "RULE-0001",
//!     "name": "Multiple failed logins",
//!     "severity": 8,
//!     "query": "MATCH (s:IP)-[:GENERATED]->(e:Event) ...",
//!     "tags": ["auth"],
//!     "mitre_techniques": ["T1110"]
//!   }
//! ]
//! ```
//!
//! 레코드별 유효성 검증과 배치 내 중복 ID 거부를 수행합니다.
//! 파일 전체가 유효할 때만 결과를 반환합니다 (all-or-nothing).

use std::collections::HashSet;
use std::path::Path;

use graphwatch_core::error::DetectionError;
use graphwatch_core::types::DetectionRule;
use tracing::info;

/// 규칙 파일 최대 크기 (바이트)
const MAX_RULES_FILE_BYTES: u64 = 4 * 1024 * 1024;

/// 규칙 파일 로더
pub struct RuleLoader;

impl RuleLoader {
    /// JSON 규칙 파일을 로드하고 검증합니다.
    ///
    /// # Errors
    ///
    /// 파일 I/O 실패, 크기 초과, JSON 파싱 실패, 레코드 검증 실패,
    /// 배치 내 중복 ID가 있으면 [`DetectionError::RuleLoad`] 또는
    /// [`DetectionError::RuleValidation`]을 반환합니다.
    pub async fn load_file(path: impl AsRef<Path>) -> Result<Vec<DetectionRule>, DetectionError> {
        let path = path.as_ref();
        let path_display = path.display().to_string();

        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| DetectionError::RuleLoad {
                path: path_display.clone(),
                reason: e.to_string(),
            })?;
        if meta.len() > MAX_RULES_FILE_BYTES {
            return Err(DetectionError::RuleLoad {
                path: path_display,
                reason: format!(
                    "rules file too large: {} bytes (max: {})",
                    meta.len(),
                    MAX_RULES_FILE_BYTES
                ),
            });
        }

        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| DetectionError::RuleLoad {
                    path: path_display.clone(),
                    reason: e.to_string(),
                })?;
        let rules = Self::parse(&content, &path_display)?;
        info!(path = path_display.as_str(), count = rules.len(), "rules file loaded");
        Ok(rules)
    }

    /// JSON 문자열에서 규칙 배치를 파싱하고 검증합니다.
    pub fn parse(content: &str, origin: &str) -> Result<Vec<DetectionRule>, DetectionError> {
        let rules: Vec<DetectionRule> =
            serde_json::from_str(content).map_err(|e| DetectionError::RuleLoad {
                path: origin.to_owned(),
                reason: format!("invalid rules JSON: {e}"),
            })?;

        let mut seen = HashSet::new();
        for rule in &rules {
            rule.validate()?;
            if !rule.rule_id.is_empty() && !seen.insert(rule.rule_id.as_str()) {
                return Err(DetectionError::RuleLoad {
                    path: origin.to_owned(),
                    reason: format!("duplicate rule id in batch: {}", rule.rule_id),
                });
            }
        }
        Ok(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    const VALID_RULES: &str = r#"[
        {
            "rule_id": "RULE-0001",
            "name": "Multiple failed logins",
            "severity": 8,
            "query": "MATCH (s:IP)-[:GENERATED]->(e:Event) RETURN s",
            "tags": ["auth"],
            "mitre_techniques": ["T1110"]
        },
        {
            "name": "Unnamed id rule",
            "severity": 3,
            "query": "MATCH (n) RETURN n"
        }
    ]"#;

    #[test]
    fn parse_valid_batch() {
        let rules = RuleLoader::parse(VALID_RULES, "test").unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].rule_id, "RULE-0001");
        assert!(rules[1].rule_id.is_empty());
        assert!(rules[1].enabled);
    }

    #[test]
    fn parse_rejects_invalid_json() {
        let err = RuleLoader::parse("{not json", "test").unwrap_err();
        assert!(matches!(err, DetectionError::RuleLoad { .. }));
    }

    #[test]
    fn parse_rejects_invalid_record() {
        let content = r#"[{"name": "", "severity": 5, "query": "MATCH (n) RETURN n"}]"#;
        let err = RuleLoader::parse(content, "test").unwrap_err();
        assert!(matches!(err, DetectionError::RuleValidation { .. }));
    }

    #[test]
    fn parse_rejects_duplicate_ids_in_batch() {
        let content = r#"[
            {"rule_id": "RULE-0001", "name": "a", "severity": 5, "query": "MATCH (n) RETURN n"},
            {"rule_id": "RULE-0001", "name": "b", "severity": 5, "query": "MATCH (n) RETURN n"}
        ]"#;
        let err = RuleLoader::parse(content, "test").unwrap_err();
        match err {
            DetectionError::RuleLoad { reason, .. } => {
                assert!(reason.contains("duplicate rule id"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn parse_allows_multiple_empty_ids() {
        let content = r#"[
            {"name": "a", "severity": 5, "query": "MATCH (n) RETURN n"},
            {"name": "b", "severity": 5, "query": "MATCH (n) RETURN n"}
        ]"#;
        let rules = RuleLoader::parse(content, "test").unwrap();
        assert_eq!(rules.len(), 2);
    }

    #[tokio::test]
    async fn load_file_roundtrip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(VALID_RULES.as_bytes()).unwrap();
        let rules = RuleLoader::load_file(file.path()).await.unwrap();
        assert_eq!(rules.len(), 2);
    }

    #[tokio::test]
    async fn load_file_missing_path() {
        let err = RuleLoader::load_file("/nonexistent/rules.json")
            .await
            .unwrap_err();
        assert!(matches!(err, DetectionError::RuleLoad { .. }));
    }

    #[tokio::test]
    async fn load_file_rejects_oversized_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let huge = "x".repeat((MAX_RULES_FILE_BYTES + 1) as usize);
        file.write_all(huge.as_bytes()).unwrap();
        let err = RuleLoader::load_file(file.path()).await.unwrap_err();
        match err {
            DetectionError::RuleLoad { reason, .. } => assert!(reason.contains("too large")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
