//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()` 매크로를 호출합니다.
//! 레코더가 설치되지 않은 프로세스에서는 기록이 무시됩니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `canarywatch_`
//! - 컴포넌트명: `reader_`, `scoring_`, `rules_`, `summary_`
//! - 접미어: `_total` (counter), `_bytes_total` (바이트 counter)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(canarywatch_core::metrics::READER_EVENTS_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 규칙 ID 레이블 키
pub const LABEL_RULE: &str = "rule";

/// 심각도 레이블 키 (info, low, medium, high, critical)
pub const LABEL_SEVERITY: &str = "severity";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

// ─── Event Reader 메트릭 ──────────────────────────────────────────

/// Reader: 정규화된 이벤트 수 (counter)
pub const READER_EVENTS_TOTAL: &str = "canarywatch_reader_events_total";

/// Reader: 파싱 실패로 건너뛴 라인 수 (counter)
pub const READER_MALFORMED_LINES_TOTAL: &str = "canarywatch_reader_malformed_lines_total";

/// Reader: 객체가 아니어서 건너뛴 레코드 수 (counter)
pub const READER_SKIPPED_RECORDS_TOTAL: &str = "canarywatch_reader_skipped_records_total";

// ─── Scoring Client 메트릭 ────────────────────────────────────────

/// Scoring: 스코어링 요청 수 (counter, label: result)
pub const SCORING_REQUESTS_TOTAL: &str = "canarywatch_scoring_requests_total";

/// Scoring: 요청 본문 바이트 수 (counter)
pub const SCORING_REQUEST_BYTES_TOTAL: &str = "canarywatch_scoring_request_bytes_total";

/// Scoring: 응답 본문 바이트 수 (counter)
pub const SCORING_RESPONSE_BYTES_TOTAL: &str = "canarywatch_scoring_response_bytes_total";

// ─── Rule Engine 메트릭 ───────────────────────────────────────────

/// Rules: 생성된 알림 수 (counter, labels: rule, severity)
pub const RULES_ALERTS_TOTAL: &str = "canarywatch_rules_alerts_total";

// ─── Run Summarizer 메트릭 ────────────────────────────────────────

/// Summary: 메트릭 싱크 전송 시도 수 (counter, label: result)
pub const SUMMARY_FORWARDS_TOTAL: &str = "canarywatch_summary_forwards_total";

/// 모든 메트릭의 설명을 등록합니다.
///
/// 레코더를 설치한 직후 한 번 호출합니다.
pub fn describe_all() {
    use metrics::describe_counter;

    describe_counter!(
        READER_EVENTS_TOTAL,
        "Total number of events normalized from input files"
    );
    describe_counter!(
        READER_MALFORMED_LINES_TOTAL,
        "Total number of input lines skipped because they were not valid JSON"
    );
    describe_counter!(
        READER_SKIPPED_RECORDS_TOTAL,
        "Total number of input records skipped because they were not JSON objects"
    );
    describe_counter!(
        SCORING_REQUESTS_TOTAL,
        "Scoring round trips by result (success, failure)"
    );
    describe_counter!(
        SCORING_REQUEST_BYTES_TOTAL,
        "Total request body bytes sent to the scoring endpoint"
    );
    describe_counter!(
        SCORING_RESPONSE_BYTES_TOTAL,
        "Total response body bytes received from the scoring endpoint"
    );
    describe_counter!(
        RULES_ALERTS_TOTAL,
        "Alerts produced by the rule engine, by rule and severity"
    );
    describe_counter!(
        SUMMARY_FORWARDS_TOTAL,
        "Run summary forwarding attempts by result (success, failure)"
    );
}
