//! 공격성 이벤트 타입 규칙 (`ATTACK_EVENT_TYPE`)
//!
//! 설정 `rules.attack_event_types`가 비어 있지 않을 때만 활성화됩니다.

use canarywatch_core::event::Event;
use canarywatch_core::pipeline::DetectionRule;
use canarywatch_core::types::{Alert, Severity};

/// 공격성 이벤트 타입 규칙 ID
pub const ATTACK_EVENT_TYPE: &str = "ATTACK_EVENT_TYPE";

/// 이벤트 타입이 목록에 있으면 알림을 생성합니다.
#[derive(Debug, Clone)]
pub struct AttackEventTypeRule {
    event_types: Vec<String>,
}

impl AttackEventTypeRule {
    /// 감시할 이벤트 타입 목록으로 규칙을 생성합니다.
    pub fn new(event_types: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            event_types: event_types.into_iter().map(Into::into).collect(),
        }
    }

    /// 감시 중인 이벤트 타입
    pub fn event_types(&self) -> &[String] {
        &self.event_types
    }
}

impl DetectionRule for AttackEventTypeRule {
    fn id(&self) -> &str {
        ATTACK_EVENT_TYPE
    }

    fn evaluate(&mut self, event: &Event) -> Vec<Alert> {
        let event_type = event.event_type_str();
        if event_type.is_empty() || !self.event_types.iter().any(|t| t == event_type) {
            return Vec::new();
        }

        vec![Alert {
            timestamp: event.timestamp.clone(),
            rule: ATTACK_EVENT_TYPE.to_owned(),
            severity: Severity::High,
            description: format!("attack-indicating event type: {}", event_type),
            evidence: event.raw.clone(),
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canarywatch_core::event::EventNormalizer;
    use serde_json::json;

    #[test]
    fn listed_type_alerts() {
        let mut rule = AttackEventTypeRule::new(["file_encrypt", "mass_write", "delete_files"]);
        let event = EventNormalizer::default()
            .normalize(json!({"event_type": "mass_write", "timestamp": "2025-12-08T12:00:01Z"}))
            .unwrap();

        let alerts = rule.evaluate(&event);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::High);
        assert!(alerts[0].description.contains("mass_write"));
    }

    #[test]
    fn unlisted_or_missing_type_is_ignored() {
        let mut rule = AttackEventTypeRule::new(["file_encrypt"]);
        let normalizer = EventNormalizer::default();
        assert!(rule
            .evaluate(&normalizer.normalize(json!({"event_type": "file_read"})).unwrap())
            .is_empty());
        assert!(rule
            .evaluate(&normalizer.normalize(json!({"pid": 3})).unwrap())
            .is_empty());
    }
}
