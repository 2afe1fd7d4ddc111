//! 탐지 파이프라인 에러 타입
//!
//! [`PipelineError`]는 파이프라인 내부에서 경계 밖으로 전파되는 에러를 표현합니다.
//! 레코드 단위 파싱 실패나 스코어링 실패는 여기까지 올라오지 않습니다
//! (경고 로그와 함께 해당 레코드만 건너뛰거나 `error:` 점수로 기록됩니다).
//! `From<PipelineError> for CanarywatchError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use canarywatch_core::error::{CanarywatchError, ConfigError};

/// 탐지 파이프라인 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 입력 파일이 존재하지 않음
    #[error("input file not found: {path}")]
    InputNotFound {
        /// 입력 파일 경로
        path: String,
    },

    /// 출력 싱크 기록 실패
    #[error("sink error: {path}: {reason}")]
    Sink {
        /// 출력 파일 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// HTTP 클라이언트 생성 실패
    #[error("http client error: {0}")]
    HttpClient(String),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 채널 통신 에러
    #[error("channel error: {0}")]
    Channel(String),

    /// JSON 직렬화 에러
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PipelineError> for CanarywatchError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::InputNotFound { path } => {
                CanarywatchError::Config(ConfigError::FileNotFound { path })
            }
            PipelineError::Config { field, reason } => {
                CanarywatchError::Config(ConfigError::InvalidValue { field, reason })
            }
            PipelineError::Io(e) => CanarywatchError::Io(e),
            other => CanarywatchError::Pipeline(other.to_string()),
        }
    }
}
