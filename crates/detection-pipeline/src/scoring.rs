//! 스코어링 클라이언트 -- 외부 스코어링 오라클 호출 및 바이트 계측
//!
//! 이벤트 하나당 `POST <endpoint>` 한 번을 수행하고 결과를 [`Detection`]으로 만듭니다.
//! 요청/응답 본문의 바이트 수를 함께 기록합니다.
//!
//! 재시도는 하지 않습니다. 각 이벤트는 독립적이며, 재시도는 파이프라인이
//! 측정하는 타이밍 기반 특성을 왜곡합니다.
//!
//! # 실패 처리
//! 연결 실패, 타임아웃, 본문 수신 실패는 모두 `score = "error:<메시지>"`로 귀결되며
//! 이 함수는 절대 에러를 반환하지 않습니다. 실패 전에 측정된 요청 바이트 수는
//! 그대로 보고되고, 응답 바이트 수는 0이 됩니다.

use std::time::Duration;

use canarywatch_core::config::ScoringConfig;
use canarywatch_core::event::Event;
use canarywatch_core::metrics as cw_metrics;
use canarywatch_core::pipeline::Scorer;
use canarywatch_core::types::{Detection, SCORE_ERROR_PREFIX};
use metrics::counter;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::PipelineError;

/// 응답에 `output` 필드가 없을 때의 점수
pub const DEFAULT_SCORE: &str = "ok";

/// HTTP 스코어링 클라이언트
#[derive(Debug, Clone)]
pub struct ScoringClient {
    /// HTTP 클라이언트 (요청 타임아웃 포함)
    client: reqwest::Client,
    /// 스코어링 엔드포인트 URL
    endpoint: String,
}

impl ScoringClient {
    /// 엔드포인트와 요청당 타임아웃으로 클라이언트를 생성합니다.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// 설정에서 클라이언트를 생성합니다.
    pub fn from_config(config: &ScoringConfig) -> Result<Self, PipelineError> {
        let timeout = Duration::try_from_secs_f64(config.timeout_secs).map_err(|e| {
            PipelineError::Config {
                field: "scoring.timeout_secs".to_owned(),
                reason: e.to_string(),
            }
        })?;
        Self::new(config.endpoint.clone(), timeout)
    }

    /// 스코어링 엔드포인트 URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// 실패한 왕복을 `error:` 점수의 Detection으로 기록합니다.
    fn failed(&self, event: &Event, reason: &str, req_bytes: u64) -> Detection {
        counter!(cw_metrics::SCORING_REQUESTS_TOTAL, cw_metrics::LABEL_RESULT => "failure")
            .increment(1);
        warn!(
            endpoint = %self.endpoint,
            event_id = event.event_id.as_deref().unwrap_or("-"),
            error = reason,
            "scoring request failed"
        );
        detection_for(event, format!("{}{}", SCORE_ERROR_PREFIX, reason), req_bytes, 0)
    }
}

impl Scorer for ScoringClient {
    async fn score(&self, event: &Event) -> Detection {
        let body = serde_json::json!({ "event": &event.raw });
        let req_bytes = measured_len(&body);
        counter!(cw_metrics::SCORING_REQUEST_BYTES_TOTAL).increment(req_bytes);

        let response = match self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return self.failed(event, &error_chain(&e), req_bytes),
        };

        let status = response.status();
        if !status.is_success() {
            warn!(
                endpoint = %self.endpoint,
                status = status.as_u16(),
                "scoring endpoint returned non-success status"
            );
        }

        let raw = match response.bytes().await {
            Ok(raw) => raw,
            Err(e) => return self.failed(event, &error_chain(&e), req_bytes),
        };
        let resp_bytes = raw.len() as u64;
        counter!(cw_metrics::SCORING_RESPONSE_BYTES_TOTAL).increment(resp_bytes);
        counter!(cw_metrics::SCORING_REQUESTS_TOTAL, cw_metrics::LABEL_RESULT => "success")
            .increment(1);

        let score = extract_score(&raw);
        debug!(
            event_id = event.event_id.as_deref().unwrap_or("-"),
            score = %score,
            req_bytes,
            resp_bytes,
            "event scored"
        );

        detection_for(event, score, req_bytes, resp_bytes)
    }
}

/// 값을 JSON으로 직렬화했을 때의 바이트 수를 잽니다.
///
/// 측정에 실패하면 경고 로그를 남기고 0을 반환합니다.
pub fn measured_len<T: Serialize + ?Sized>(value: &T) -> u64 {
    let mut counter = ByteCounter(0);
    match serde_json::to_writer(&mut counter, value) {
        Ok(()) => counter.0,
        Err(e) => {
            warn!(error = %e, "failed to measure request size, recording 0 bytes");
            0
        }
    }
}

/// 기록된 바이트 수만 세는 writer
struct ByteCounter(u64);

impl std::io::Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0 += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// 이벤트와 스코어링 결과로 Detection을 만듭니다.
pub fn detection_for(event: &Event, score: String, req_bytes: u64, resp_bytes: u64) -> Detection {
    Detection {
        event_id: event.event_id.clone(),
        timestamp: event.timestamp.clone(),
        event_type: event.event_type.clone(),
        label: event.label.clone(),
        score,
        llm_req_bytes: req_bytes,
        llm_resp_bytes: resp_bytes,
    }
}

/// 응답 본문에서 점수를 추출합니다.
///
/// JSON이 아닌 본문은 `{"output": <본문 텍스트>}`로 감쌉니다.
/// `output`이 없거나 응답이 객체가 아니면 [`DEFAULT_SCORE`]를 반환합니다.
pub fn extract_score(body: &[u8]) -> String {
    let value = serde_json::from_slice::<Value>(body)
        .unwrap_or_else(|_| serde_json::json!({ "output": String::from_utf8_lossy(body) }));

    match value.get("output") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => DEFAULT_SCORE.to_owned(),
        Some(other) => other.to_string(),
    }
}

/// 에러와 source 체인을 `: `로 이어 붙입니다.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_msg = cause.to_string();
        if !message.contains(&cause_msg) {
            message.push_str(": ");
            message.push_str(&cause_msg);
        }
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use canarywatch_core::event::EventNormalizer;
    use serde_json::json;

    fn sample_event() -> Event {
        EventNormalizer::default()
            .normalize(json!({
                "event_id": "e1",
                "timestamp": "2025-12-08T12:00:00Z",
                "event_type": "file_write",
                "path": "/home/user/canary/report.docx",
                "label": "attack"
            }))
            .unwrap()
    }

    #[test]
    fn extract_score_from_output_field() {
        assert_eq!(extract_score(br#"{"id":1,"model":"dummy-llm","output":"malicious"}"#), "malicious");
    }

    #[test]
    fn extract_score_defaults_to_ok() {
        assert_eq!(extract_score(br#"{"model":"dummy-llm"}"#), DEFAULT_SCORE);
        assert_eq!(extract_score(br#"{"output":null}"#), DEFAULT_SCORE);
        assert_eq!(extract_score(br#"[1,2,3]"#), DEFAULT_SCORE);
    }

    #[test]
    fn extract_score_wraps_plain_text() {
        assert_eq!(extract_score(b"benign"), "benign");
    }

    #[test]
    fn extract_score_stringifies_non_string_output() {
        assert_eq!(extract_score(br#"{"output":0.93}"#), "0.93");
        assert_eq!(extract_score(br#"{"output":{"verdict":"attack"}}"#), r#"{"verdict":"attack"}"#);
    }

    #[test]
    fn detection_copies_event_fields() {
        let event = sample_event();
        let detection = detection_for(&event, "ok".to_owned(), 120, 80);
        assert_eq!(detection.event_id.as_deref(), Some("e1"));
        assert_eq!(detection.event_type.as_deref(), Some("file_write"));
        assert_eq!(detection.label, "attack");
        assert_eq!(detection.llm_req_bytes, 120);
        assert_eq!(detection.llm_resp_bytes, 80);
    }

    #[test]
    fn from_config_rejects_negative_timeout() {
        let config = ScoringConfig {
            timeout_secs: -1.0,
            ..ScoringConfig::default()
        };
        assert!(matches!(
            ScoringClient::from_config(&config),
            Err(PipelineError::Config { .. })
        ));
    }

    #[tokio::test]
    async fn connection_refused_yields_error_detection() {
        // 바인딩 후 즉시 닫은 포트로 연결 거부를 재현합니다.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client =
            ScoringClient::new(format!("http://{}/v1/infer", addr), Duration::from_secs(2)).unwrap();
        let event = sample_event();
        let detection = client.score(&event).await;

        let expected_req = serde_json::to_vec(&json!({"event": &event.raw})).unwrap().len() as u64;
        assert!(detection.score.starts_with("error:"), "score: {}", detection.score);
        assert_eq!(detection.llm_req_bytes, expected_req);
        assert_eq!(detection.llm_resp_bytes, 0);
        assert_eq!(detection.event_id.as_deref(), Some("e1"));
    }

    #[test]
    fn measured_len_matches_serialized_request() {
        let body = json!({"event": sample_event().raw});
        let expected = serde_json::to_vec(&body).unwrap().len() as u64;
        assert_eq!(measured_len(&body), expected);
    }

    /// 직렬화가 항상 실패하는 값
    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("not representable"))
        }
    }

    #[test]
    fn measured_len_falls_back_to_zero() {
        assert_eq!(measured_len(&Unserializable), 0);
    }
}
