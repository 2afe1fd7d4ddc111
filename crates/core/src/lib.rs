#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`event`]: 이기종 JSON 레코드의 별칭 해석 및 표준 [`Event`] 정규화
//! - [`types`]: [`Detection`], [`Alert`], [`RunSummary`], [`Severity`]
//! - [`pipeline`]: 확장 포인트 trait ([`Scorer`], [`DetectionRule`])
//! - [`config`]: `canarywatch.toml` + 환경변수 설정
//! - [`error`]: 도메인 에러 타입
//! - [`metrics`]: 메트릭 이름 상수

pub mod config;
pub mod error;
pub mod event;
pub mod metrics;
pub mod pipeline;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{CanarywatchError, ConfigError, EndpointError, ParseError};

// 설정
pub use config::CanarywatchConfig;

// 이벤트
pub use event::{Event, EventNormalizer, FieldAliases};

// 파이프라인 trait
pub use pipeline::{DetectionRule, Scorer};

// 도메인 타입
pub use types::{Alert, Detection, RunSummary, Severity};
