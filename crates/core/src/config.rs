//! 설정 관리 — graphwatch.toml 파싱 및 런타임 설정
//!
//! [`GraphwatchConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`GRAPHWATCH_GRAPH_URI=bolt://...` 형식)
//! 3. 설정 파일 (`graphwatch.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), graphwatch_core::error::GraphwatchError> {
//! use graphwatch_core::config::GraphwatchConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = GraphwatchConfig::load("graphwatch.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = GraphwatchConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, GraphwatchError};

/// Graphwatch 통합 설정
///
/// `graphwatch.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 모듈은 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphwatchConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 그래프 스토어 설정
    #[serde(default)]
    pub graph: GraphConfig,
    /// 인제스트 설정
    #[serde(default)]
    pub ingest: IngestConfig,
    /// 탐지 엔진 설정
    #[serde(default)]
    pub detection: DetectionConfig,
    /// 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl GraphwatchConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, GraphwatchError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, GraphwatchError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                GraphwatchError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                GraphwatchError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, GraphwatchError> {
        toml::from_str(toml_str).map_err(|e| {
            GraphwatchError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `GRAPHWATCH_{SECTION}_{FIELD}`
    /// 예: `GRAPHWATCH_GRAPH_URI=http://neo4j:7474`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "GRAPHWATCH_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "GRAPHWATCH_GENERAL_LOG_FORMAT");

        // Graph
        override_string(&mut self.graph.backend, "GRAPHWATCH_GRAPH_BACKEND");
        override_string(&mut self.graph.uri, "GRAPHWATCH_GRAPH_URI");
        override_string(&mut self.graph.user, "GRAPHWATCH_GRAPH_USER");
        override_string(&mut self.graph.password, "GRAPHWATCH_GRAPH_PASSWORD");
        override_string(&mut self.graph.database, "GRAPHWATCH_GRAPH_DATABASE");
        override_string(&mut self.graph.event_dedup, "GRAPHWATCH_GRAPH_EVENT_DEDUP");

        // Ingest
        override_bool(&mut self.ingest.enabled, "GRAPHWATCH_INGEST_ENABLED");
        override_usize(
            &mut self.ingest.queue_capacity,
            "GRAPHWATCH_INGEST_QUEUE_CAPACITY",
        );
        override_string(&mut self.ingest.intake_bind, "GRAPHWATCH_INGEST_INTAKE_BIND");

        // Detection
        override_string(&mut self.detection.rules_file, "GRAPHWATCH_DETECTION_RULES_FILE");
        override_u64(
            &mut self.detection.sweep_interval_secs,
            "GRAPHWATCH_DETECTION_SWEEP_INTERVAL_SECS",
        );
        override_bool(
            &mut self.detection.store_alerts,
            "GRAPHWATCH_DETECTION_STORE_ALERTS",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "GRAPHWATCH_METRICS_ENABLED");
        override_string(&mut self.metrics.listen, "GRAPHWATCH_METRICS_LISTEN");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), GraphwatchError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        // backend 검증
        let valid_backends = ["http", "memory"];
        if !valid_backends.contains(&self.graph.backend.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "graph.backend".to_owned(),
                reason: format!("must be one of: {}", valid_backends.join(", ")),
            }
            .into());
        }

        if self.graph.backend == "http" && self.graph.uri.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "graph.uri".to_owned(),
                reason: "uri must not be empty when backend is 'http'".to_owned(),
            }
            .into());
        }

        // 이벤트 중복 정책 검증
        let valid_dedup = ["append-only", "merge-by-hash"];
        if !valid_dedup.contains(&self.graph.event_dedup.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "graph.event_dedup".to_owned(),
                reason: format!("must be one of: {}", valid_dedup.join(", ")),
            }
            .into());
        }

        if self.ingest.queue_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ingest.queue_capacity".to_owned(),
                reason: "queue capacity must be greater than 0".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 그래프 스토어 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// 백엔드 종류 (http, memory)
    pub backend: String,
    /// 스토어 HTTP URI (예: http://localhost:7474)
    pub uri: String,
    /// 스토어 사용자명
    pub user: String,
    /// 스토어 비밀번호
    pub password: String,
    /// 대상 데이터베이스 이름
    pub database: String,
    /// 재전달 이벤트 중복 정책 (append-only, merge-by-hash)
    pub event_dedup: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            backend: "http".to_owned(),
            uri: "http://localhost:7474".to_owned(),
            user: "neo4j".to_owned(),
            password: String::new(),
            database: "neo4j".to_owned(),
            event_dedup: "append-only".to_owned(),
        }
    }
}

/// 인제스트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// 큐 소비 루프 활성화 여부
    pub enabled: bool,
    /// 인제스트 채널 용량
    pub queue_capacity: usize,
    /// TCP 라인 인테이크 바인드 주소 (비어 있으면 비활성화)
    pub intake_bind: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            queue_capacity: 1024,
            intake_bind: String::new(),
        }
    }
}

/// 탐지 엔진 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// 시작 시 로드할 규칙 파일 경로 (비어 있으면 로드하지 않음)
    pub rules_file: String,
    /// 전체 규칙 주기 실행 간격 (초, 0이면 비활성화 — 기본값)
    pub sweep_interval_secs: u64,
    /// 생성된 알림을 그래프에 기록할지 여부
    pub store_alerts: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            rules_file: String::new(),
            sweep_interval_secs: 0,
            store_alerts: true,
        }
    }
}

/// 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus exporter 활성화 여부
    pub enabled: bool,
    /// exporter 리슨 주소
    pub listen: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: "127.0.0.1:9400".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
