//! 카나리 파일 접근 규칙 (`WRITE_CANARY`, `SUSPICIOUS_DELETE`)

use canarywatch_core::event::{EVENT_TYPE_FILE_DELETE, EVENT_TYPE_FILE_WRITE, Event};
use canarywatch_core::pipeline::DetectionRule;
use canarywatch_core::types::{Alert, Severity};

/// 카나리 파일 쓰기 규칙 ID
pub const WRITE_CANARY: &str = "WRITE_CANARY";

/// 카나리 파일 삭제 규칙 ID
pub const SUSPICIOUS_DELETE: &str = "SUSPICIOUS_DELETE";

/// 특정 이벤트 타입이 카나리 파일을 건드리면 알림을 생성하는 상태 없는 규칙
///
/// 파일명 비교는 대소문자를 구분하지 않는 부분 문자열 매칭입니다.
#[derive(Debug, Clone)]
pub struct CanaryAccessRule {
    id: &'static str,
    event_type: &'static str,
    description: &'static str,
    /// 소문자로 정규화된 카나리 마커
    marker: String,
}

impl CanaryAccessRule {
    /// `file_write` 이벤트용 규칙
    pub fn write_canary(marker: &str) -> Self {
        Self {
            id: WRITE_CANARY,
            event_type: EVENT_TYPE_FILE_WRITE,
            description: "write to canary file",
            marker: marker.to_lowercase(),
        }
    }

    /// `file_delete` 이벤트용 규칙
    pub fn suspicious_delete(marker: &str) -> Self {
        Self {
            id: SUSPICIOUS_DELETE,
            event_type: EVENT_TYPE_FILE_DELETE,
            description: "delete of canary file",
            marker: marker.to_lowercase(),
        }
    }

    fn touches_canary(&self, event: &Event) -> bool {
        event
            .filename
            .as_deref()
            .is_some_and(|name| name.to_lowercase().contains(&self.marker))
    }
}

impl DetectionRule for CanaryAccessRule {
    fn id(&self) -> &str {
        self.id
    }

    fn evaluate(&mut self, event: &Event) -> Vec<Alert> {
        if !event.is_type(self.event_type) || !self.touches_canary(event) {
            return Vec::new();
        }

        vec![Alert {
            timestamp: event.timestamp.clone(),
            rule: self.id.to_owned(),
            severity: Severity::High,
            description: self.description.to_owned(),
            evidence: event.raw.clone(),
        }]
    }
}
