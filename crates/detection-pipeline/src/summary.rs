//! 실행 요약기 -- 실행 단위 처리량/바이트 통계 산출, 로컬 저장, 메트릭 싱크 전송
//!
//! # 패킷 속도
//! `llm_packet_rate = 패킷 수 / (가장 늦은 타임스탬프 - 가장 이른 타임스탬프)` (초).
//! 파싱 가능한 타임스탬프가 없거나 구간이 0이면 속도는 정의되지 않으므로
//! 항상 0.0을 보고합니다.
//!
//! # 전송 실패
//! 메트릭 싱크 전송 실패는 경고 로그로만 남으며 로컬 저장 결과나
//! 프로세스 종료 코드에 영향을 주지 않습니다.

use std::path::{Path, PathBuf};
use std::time::Duration;

use canarywatch_core::config::MetricsConfig;
use canarywatch_core::event::{EVENT_TYPE_FILE_READ, EVENT_TYPE_FILE_WRITE, EventNormalizer};
use canarywatch_core::metrics as cw_metrics;
use canarywatch_core::types::{RunSummary, utc_now_string};
use chrono::{DateTime, NaiveDateTime, Utc};
use metrics::counter;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::reader::RecordReader;

/// 요청 바이트 필드명
pub const FIELD_REQ_BYTES: &str = "llm_req_bytes";
/// 응답 바이트 필드명
pub const FIELD_RESP_BYTES: &str = "llm_resp_bytes";

/// 시간대 표기가 있는 타임스탬프 형식 (`Z` 접미어)
const ZULU_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.fZ", "%Y-%m-%dT%H:%M:%SZ"];

/// 시간대 표기가 없는 타임스탬프 형식 (UTC로 간주)
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// ISO-8601 변형 타임스탬프를 UTC로 파싱합니다.
///
/// 지원 형식: 소수 초 유무와 무관한 `Z` 접미어 형식, 오프셋이 있는 RFC 3339,
/// 시간대 없는 ISO-8601 (UTC로 간주). 파싱할 수 없으면 `None`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    for format in ZULU_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

/// JSON 값을 바이트 수로 변환합니다.
///
/// 정수, 소수(버림), 숫자 문자열을 허용합니다. 음수, null, 그 밖의 값은 0입니다.
pub fn coerce_bytes(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => {
            if let Some(v) = n.as_u64() {
                v
            } else {
                n.as_f64().map(float_to_bytes).unwrap_or(0)
            }
        }
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(float_to_bytes))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

fn float_to_bytes(v: f64) -> u64 {
    if v.is_finite() && v > 0.0 {
        v.trunc() as u64
    } else {
        0
    }
}

/// 패킷 수와 타임스탬프 구간으로 패킷 속도를 계산합니다.
pub fn packet_rate(packets: u64, timestamps: &[DateTime<Utc>]) -> f64 {
    let (Some(start), Some(end)) = (timestamps.iter().min(), timestamps.iter().max()) else {
        return 0.0;
    };

    let span = (*end - *start)
        .to_std()
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);

    if span > 0.0 {
        packets as f64 / span
    } else {
        0.0
    }
}

/// 원시 이벤트와 탐지 결과 레코드로 실행 요약을 만듭니다.
pub fn summarize(
    run_id: &str,
    raw_records: impl IntoIterator<Item = Value>,
    detection_records: impl IntoIterator<Item = Value>,
    normalizer: &EventNormalizer,
) -> RunSummary {
    let mut file_reads = 0u64;
    let mut file_writes = 0u64;

    for record in raw_records {
        let Ok(event) = normalizer.normalize(record) else {
            continue;
        };
        if event.is_type(EVENT_TYPE_FILE_READ) {
            file_reads += 1;
        } else if event.is_type(EVENT_TYPE_FILE_WRITE) {
            file_writes += 1;
        }
    }

    let mut llm_packets = 0u64;
    let mut llm_total_bytes = 0u64;
    let mut timestamps = Vec::new();

    for (index, record) in detection_records.into_iter().enumerate() {
        let req_bytes = coerce_bytes(record.get(FIELD_REQ_BYTES));
        let resp_bytes = coerce_bytes(record.get(FIELD_RESP_BYTES));

        let event = match normalizer.normalize(record) {
            Ok(event) => event,
            Err(e) => {
                warn!(record = index, error = %e, "skipping detection record");
                continue;
            }
        };

        llm_packets += 1;
        llm_total_bytes = llm_total_bytes.saturating_add(req_bytes.saturating_add(resp_bytes));

        match event.timestamp.as_deref().map(|ts| (ts, parse_timestamp(ts))) {
            Some((_, Some(parsed))) => timestamps.push(parsed),
            Some((raw, None)) => debug!(record = index, timestamp = raw, "unparseable timestamp dropped"),
            None => {}
        }
    }

    RunSummary {
        run_id: run_id.to_owned(),
        file_reads,
        file_writes,
        llm_packets,
        llm_total_bytes,
        llm_packet_rate: packet_rate(llm_packets, &timestamps),
        timestamp: utc_now_string(),
    }
}

/// 원시 이벤트 파일과 탐지 결과 파일을 읽어 실행 요약을 만듭니다.
pub async fn summarize_files(
    run_id: &str,
    raw_path: impl AsRef<Path>,
    proc_path: impl AsRef<Path>,
    normalizer: &EventNormalizer,
) -> Result<RunSummary, PipelineError> {
    let raw = RecordReader::open(raw_path).await?;
    let processed = RecordReader::open(proc_path).await?;
    Ok(summarize(run_id, raw, processed, normalizer))
}

/// 실행 요약 로컬 저장소
///
/// `<out_dir>/<run_id>_summary.json`에 pretty JSON으로 기록합니다.
#[derive(Debug, Clone)]
pub struct SummaryWriter {
    out_dir: PathBuf,
}

impl SummaryWriter {
    /// 출력 디렉토리로 저장소를 생성합니다.
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    /// run id의 요약 파일 경로
    pub fn path_for(&self, run_id: &str) -> PathBuf {
        self.out_dir.join(format!("{}_summary.json", run_id))
    }

    /// 요약을 저장하고 기록한 파일 경로를 반환합니다.
    ///
    /// 출력 디렉토리가 없으면 생성합니다.
    pub async fn persist(&self, summary: &RunSummary) -> Result<PathBuf, PipelineError> {
        validate_run_id(&summary.run_id)?;

        tokio::fs::create_dir_all(&self.out_dir).await?;
        let path = self.path_for(&summary.run_id);
        let body = serde_json::to_vec_pretty(summary)?;

        tokio::fs::write(&path, body)
            .await
            .map_err(|e| PipelineError::Sink {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        info!(path = %path.display(), run_id = %summary.run_id, "run summary written");
        Ok(path)
    }
}

/// run id가 파일명 구성 요소로 안전한지 확인합니다.
fn validate_run_id(run_id: &str) -> Result<(), PipelineError> {
    if run_id.is_empty() || run_id == "." || run_id == ".." || run_id.contains(['/', '\\']) {
        return Err(PipelineError::Config {
            field: "run_id".to_owned(),
            reason: format!("'{}' is not a valid file name component", run_id),
        });
    }
    Ok(())
}

/// 메트릭 싱크 전송 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardOutcome {
    /// 2xx 응답
    Succeeded {
        /// HTTP 상태 코드
        status: u16,
    },
    /// 전송 실패 또는 비-2xx 응답
    Failed {
        /// 실패 사유
        reason: String,
    },
}

impl ForwardOutcome {
    /// 성공 여부
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// 메트릭 싱크 HTTP 클라이언트
#[derive(Debug, Clone)]
pub struct MetricsForwarder {
    client: reqwest::Client,
    url: String,
}

impl MetricsForwarder {
    /// 싱크 URL과 타임아웃으로 전송기를 생성합니다.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// 설정에서 전송기를 생성합니다.
    pub fn from_config(config: &MetricsConfig) -> Result<Self, PipelineError> {
        let timeout = Duration::try_from_secs_f64(config.timeout_secs).map_err(|e| {
            PipelineError::Config {
                field: "metrics.timeout_secs".to_owned(),
                reason: e.to_string(),
            }
        })?;
        Self::new(config.url.clone(), timeout)
    }

    /// 싱크 URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// 요약을 싱크로 전송합니다. 실패해도 에러를 반환하지 않습니다.
    pub async fn forward(&self, summary: &RunSummary) -> ForwardOutcome {
        let outcome = match self.client.post(&self.url).json(summary).send().await {
            Ok(response) if response.status().is_success() => ForwardOutcome::Succeeded {
                status: response.status().as_u16(),
            },
            Ok(response) => ForwardOutcome::Failed {
                reason: format!("metrics sink returned status {}", response.status().as_u16()),
            },
            Err(e) => ForwardOutcome::Failed {
                reason: e.to_string(),
            },
        };

        match &outcome {
            ForwardOutcome::Succeeded { status } => {
                counter!(cw_metrics::SUMMARY_FORWARDS_TOTAL, cw_metrics::LABEL_RESULT => "success")
                    .increment(1);
                info!(url = %self.url, status, "run summary forwarded");
            }
            ForwardOutcome::Failed { reason } => {
                counter!(cw_metrics::SUMMARY_FORWARDS_TOTAL, cw_metrics::LABEL_RESULT => "failure")
                    .increment(1);
                warn!(url = %self.url, error = %reason, "failed to forward run summary");
            }
        }

        outcome
    }
}
