//! 에러 타입 -- 도메인별 에러 정의

/// canarywatch 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum CanarywatchError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 입력 파싱 에러
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// 스코어링 / 메트릭 전송 등 외부 엔드포인트 에러
    #[error("endpoint error: {0}")]
    Endpoint(#[from] EndpointError),

    /// 파이프라인 처리 에러
    #[error("pipeline error: {0}")]
    Pipeline(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 입력 파싱 에러
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// JSON 객체가 아닌 레코드
    #[error("expected JSON object, found {found}")]
    NotAnObject { found: String },

    /// 파싱 실패
    #[error("parse failed at line {line}: {reason}")]
    Failed { line: usize, reason: String },
}

/// 외부 엔드포인트 에러
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    /// 요청 전송 실패 (연결 거부, 타임아웃 등)
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    /// 2xx 이외의 응답
    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },
}
