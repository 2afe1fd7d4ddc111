//! 설정 관리 -- canarywatch.toml 파싱 및 런타임 설정
//!
//! [`CanarywatchConfig`]는 모든 컴포넌트의 설정을 담는 최상위 구조체입니다.
//! 프로세스 진입점에서 한 번만 해석되고, 각 컴포넌트는 생성 시 자기 섹션을
//! 전달받습니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`CANARYWATCH_SCORING_ENDPOINT=http://...` 형식)
//! 3. 설정 파일 (`canarywatch.toml`, 선택)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), canarywatch_core::error::CanarywatchError> {
//! use canarywatch_core::config::CanarywatchConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = CanarywatchConfig::load("canarywatch.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = CanarywatchConfig::parse("[scoring]\ntimeout_secs = 5.0")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{CanarywatchError, ConfigError};
use crate::event::FieldAliases;

/// 스코어링 엔드포인트 기본값
pub const DEFAULT_SCORING_ENDPOINT: &str = "http://127.0.0.1:8080/v1/infer";
/// 메트릭 싱크 기본값
pub const DEFAULT_METRICS_URL: &str = "http://127.0.0.1:8080/v1/metrics";
/// 메트릭 싱크 URL 레거시 환경변수
pub const LEGACY_METRICS_URL_ENV: &str = "METRICS_URL";
/// 기본 카나리 마커
pub const DEFAULT_CANARY_MARKER: &str = "canary";
/// 기본 MANY_EXEC 임계값
pub const DEFAULT_MANY_EXEC_THRESHOLD: u64 = 20;

/// canarywatch 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanarywatchConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 스코어링 클라이언트 설정
    #[serde(default)]
    pub scoring: ScoringConfig,
    /// 실행 요약 / 메트릭 싱크 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// 규칙 엔진 설정
    #[serde(default)]
    pub rules: RulesConfig,
    /// 필드 별칭 테이블
    #[serde(default)]
    pub aliases: FieldAliases,
}

impl CanarywatchConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, CanarywatchError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 설정 파일이 주어지면 로드하고, 없으면 기본값에 환경변수만 적용합니다.
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, CanarywatchError> {
        match path {
            Some(path) => Self::load(path).await,
            None => {
                let mut config = Self::default();
                config.apply_env_overrides();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, CanarywatchError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CanarywatchError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                CanarywatchError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, CanarywatchError> {
        toml::from_str(toml_str).map_err(|e| {
            CanarywatchError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `CANARYWATCH_{SECTION}_{FIELD}`
    /// 예: `CANARYWATCH_SCORING_ENDPOINT=http://10.0.0.5:8080/v1/infer`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "CANARYWATCH_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "CANARYWATCH_GENERAL_LOG_FORMAT");

        // Scoring
        override_string(&mut self.scoring.endpoint, "CANARYWATCH_SCORING_ENDPOINT");
        override_f64(
            &mut self.scoring.timeout_secs,
            "CANARYWATCH_SCORING_TIMEOUT_SECS",
        );
        override_usize(
            &mut self.scoring.concurrency,
            "CANARYWATCH_SCORING_CONCURRENCY",
        );

        // Metrics sink (레거시 METRICS_URL은 전용 변수보다 우선순위가 낮음)
        override_string(&mut self.metrics.url, LEGACY_METRICS_URL_ENV);
        override_string(&mut self.metrics.url, "CANARYWATCH_METRICS_URL");
        override_f64(
            &mut self.metrics.timeout_secs,
            "CANARYWATCH_METRICS_TIMEOUT_SECS",
        );
        override_string(&mut self.metrics.out_dir, "CANARYWATCH_METRICS_OUT_DIR");

        // Rules
        override_string(
            &mut self.rules.canary_marker,
            "CANARYWATCH_RULES_CANARY_MARKER",
        );
        override_u64(
            &mut self.rules.many_exec_threshold,
            "CANARYWATCH_RULES_MANY_EXEC_THRESHOLD",
        );
        override_csv(
            &mut self.rules.attack_event_types,
            "CANARYWATCH_RULES_ATTACK_EVENT_TYPES",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), CanarywatchError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        validate_url("scoring.endpoint", &self.scoring.endpoint)?;
        validate_timeout("scoring.timeout_secs", self.scoring.timeout_secs)?;
        if self.scoring.concurrency == 0 {
            return Err(invalid(
                "scoring.concurrency",
                "must be greater than 0".to_owned(),
            ));
        }

        validate_url("metrics.url", &self.metrics.url)?;
        validate_timeout("metrics.timeout_secs", self.metrics.timeout_secs)?;
        if self.metrics.out_dir.is_empty() {
            return Err(invalid(
                "metrics.out_dir",
                "must not be empty".to_owned(),
            ));
        }

        if self.rules.canary_marker.is_empty() {
            return Err(invalid(
                "rules.canary_marker",
                "must not be empty".to_owned(),
            ));
        }
        if self.rules.many_exec_threshold == 0 {
            return Err(invalid(
                "rules.many_exec_threshold",
                "must be greater than 0".to_owned(),
            ));
        }

        if self.aliases.event_id.is_empty() {
            return Err(invalid(
                "aliases.event_id",
                "at least one alias is required".to_owned(),
            ));
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

/// 스코어링 클라이언트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// 스코어링 엔드포인트 URL
    pub endpoint: String,
    /// 요청당 타임아웃 (초)
    pub timeout_secs: f64,
    /// 동시에 진행할 최대 스코어링 요청 수 (1 = 순차 처리)
    pub concurrency: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_SCORING_ENDPOINT.to_owned(),
            timeout_secs: 2.0,
            concurrency: 1,
        }
    }
}

/// 실행 요약 / 메트릭 싱크 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 메트릭 싱크 URL
    pub url: String,
    /// 전송 타임아웃 (초)
    pub timeout_secs: f64,
    /// 로컬 요약 파일 디렉토리
    pub out_dir: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_METRICS_URL.to_owned(),
            timeout_secs: 3.0,
            out_dir: "metrics".to_owned(),
        }
    }
}

/// 규칙 엔진 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// 카나리 파일 판별 문자열 (대소문자 무시)
    pub canary_marker: String,
    /// MANY_EXEC 임계값 (이 값을 초과해야 알림)
    pub many_exec_threshold: u64,
    /// ATTACK_EVENT_TYPE 규칙 대상 이벤트 타입 (비어 있으면 규칙 비활성)
    pub attack_event_types: Vec<String>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            canary_marker: DEFAULT_CANARY_MARKER.to_owned(),
            many_exec_threshold: DEFAULT_MANY_EXEC_THRESHOLD,
            attack_event_types: Vec::new(),
        }
    }
}

fn invalid(field: &str, reason: String) -> CanarywatchError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

fn validate_url(field: &str, url: &str) -> Result<(), CanarywatchError> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(invalid(
            field,
            format!("'{}' must be an http(s) URL", url),
        ));
    }
    Ok(())
}

fn validate_timeout(field: &str, secs: f64) -> Result<(), CanarywatchError> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(invalid(field, "must be a positive number of seconds".to_owned()));
    }
    Ok(())
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
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

fn override_f64(target: &mut f64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<f64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse f64 from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}
