//! 도메인 타입 -- 파이프라인 전역에서 사용되는 공통 타입
//!
//! 스코어링 결과([`Detection`]), 규칙 알림([`Alert`]), 실행 요약([`RunSummary`])을
//! 정의합니다. 모든 레코드는 한 번 생성된 뒤 곧바로 출력 싱크에 기록되며
//! 이후 변경되지 않습니다.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 스코어링 결과 레코드
///
/// 이벤트 하나와 스코어링 왕복 한 번에서 파생됩니다.
/// 출력 파일에는 JSON Lines 형식으로 한 줄씩 기록됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// 원본 이벤트 ID (원본에 없으면 `null`)
    pub event_id: Option<String>,
    /// 원본 이벤트 타임스탬프
    pub timestamp: Option<String>,
    /// 원본 이벤트 타입
    pub event_type: Option<String>,
    /// 정답 라벨 (기본값 `normal`)
    pub label: String,
    /// 오라클 출력 또는 `error:<메시지>`
    pub score: String,
    /// 요청 본문 바이트 수
    pub llm_req_bytes: u64,
    /// 응답 본문 바이트 수
    pub llm_resp_bytes: u64,
}

impl Detection {
    /// 스코어링 왕복이 실패했는지 여부
    pub fn is_error(&self) -> bool {
        self.score.starts_with(SCORE_ERROR_PREFIX)
    }
}

/// 실패한 스코어링 결과의 `score` 접두어
pub const SCORE_ERROR_PREFIX: &str = "error:";

/// 규칙 엔진 알림
///
/// 단일 이벤트 또는 배치 전체 집계에서 생성됩니다.
/// `evidence`는 감사를 위해 원본 이벤트(또는 합성 집계 객체)를 그대로 보존합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// 원본 이벤트 타임스탬프 (배치 집계 알림은 `None`)
    pub timestamp: Option<String>,
    /// 규칙 ID (예: `WRITE_CANARY`)
    pub rule: String,
    /// 심각도
    pub severity: Severity,
    /// 사람이 읽을 수 있는 설명
    pub description: String,
    /// 근거 데이터
    pub evidence: serde_json::Value,
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.rule, self.description)
    }
}

/// 실행(run) 단위 요약
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// 실행 ID
    pub run_id: String,
    /// 원시 이벤트 중 `file_read` 수
    pub file_reads: u64,
    /// 원시 이벤트 중 `file_write` 수
    pub file_writes: u64,
    /// 스코어링 레코드 수
    pub llm_packets: u64,
    /// 요청 + 응답 바이트 합계
    pub llm_total_bytes: u64,
    /// 초당 스코어링 레코드 수 (정의되지 않으면 0.0)
    pub llm_packet_rate: f64,
    /// 요약 생성 시각 (UTC, `%Y-%m-%dT%H:%M:%SZ`)
    pub timestamp: String,
}

/// 현재 UTC 시각을 `%Y-%m-%dT%H:%M:%SZ` 형식으로 반환합니다.
pub fn utc_now_string() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// 심각도 레벨
///
/// `Ord` 구현으로 심각도 비교가 가능합니다 (`Info < Low < Medium < High < Critical`).
/// 직렬화 시 대문자(`HIGH`)를 사용합니다.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// 정보성 이벤트
    #[default]
    Info,
    /// 낮은 심각도
    Low,
    /// 중간 심각도
    Medium,
    /// 높은 심각도
    High,
    /// 치명적
    Critical,
}

impl Severity {
    /// 문자열에서 심각도를 파싱합니다.
    ///
    /// 대소문자를 구분하지 않습니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "info" | "informational" => Some(Self::Info),
            "low" => Some(Self::Low),
            "medium" | "med" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" | "crit" => Some(Self::Critical),
            _ => None,
        }
    }

    /// 메트릭 레이블 등에 사용하는 소문자 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}
