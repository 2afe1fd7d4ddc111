#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`reader`]: JSON Lines / JSON 배열 / 단일 객체 입력의 2단계 파싱 및 이벤트 정규화
//! - [`scoring`]: 외부 스코어링 오라클 HTTP 클라이언트 (바이트 계측 포함)
//! - [`rule`]: trait 기반 탐지 규칙 엔진 (`WRITE_CANARY`, `SUSPICIOUS_DELETE`, `MANY_EXEC`)
//! - [`evaluate`]: 정답 라벨 조인 및 TP/FP/FN, 정밀도/재현율/F1 계산
//! - [`summary`]: 실행 요약 산출, 로컬 저장, 메트릭 싱크 전송
//! - [`ingest`]: 읽기 -> 스코어링 -> JSONL 기록 오케스트레이션
//! - [`sink`]: 탐지 결과/알림/보고서 출력
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! EventReader -> Scorer (N workers) -> mpsc -> DetectionSink -> detections.jsonl
//!      |                                                             |
//!      +-> RuleEngine -> alerts.json                      evaluate / summary
//! ```

pub mod error;
pub mod evaluate;
pub mod ingest;
pub mod reader;
pub mod rule;
pub mod scoring;
pub mod sink;
pub mod summary;

// --- 주요 타입 re-export ---

// 에러
pub use error::PipelineError;

// 입력
pub use reader::{EventReader, RecordReader};

// 스코어링
pub use scoring::ScoringClient;

// 규칙 엔진
pub use rule::{ExecCounter, RuleEngine, apply_rules};

// 평가
pub use evaluate::{ConfusionCounts, Evaluation, EvaluationReport, TruthLabels};

// 실행 요약
pub use summary::{ForwardOutcome, MetricsForwarder, SummaryWriter, parse_timestamp, summarize};

// 수집
pub use ingest::{IngestPipeline, IngestStats};

// 출력
pub use sink::{DetectionSink, write_alerts, write_report};
