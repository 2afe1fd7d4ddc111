//! 탐지 규칙 엔진 -- 이벤트 배치에 휴리스틱 규칙 적용
//!
//! 각 규칙은 [`DetectionRule`] trait을 구현하며, 엔진은 규칙 목록을
//! 순서대로 조합할 뿐 규칙별 분기를 갖지 않습니다.
//!
//! # 기본 규칙
//! - [`WRITE_CANARY`]: 카나리 파일 쓰기 (HIGH)
//! - [`SUSPICIOUS_DELETE`]: 카나리 파일 삭제 (HIGH)
//! - [`MANY_EXEC`]: pid별 실행 이벤트가 임계값 초과 (MEDIUM, 배치 집계)
//!
//! 설정 `rules.attack_event_types`가 있으면 [`ATTACK_EVENT_TYPE`]이 추가됩니다.
//!
//! # 알림 순서
//! 이벤트 단위 알림은 이벤트 도착 순서대로, 집계 알림은 그 뒤에 붙습니다.

pub mod canary;
pub mod event_type;
pub mod exec;

pub use canary::{CanaryAccessRule, SUSPICIOUS_DELETE, WRITE_CANARY};
pub use event_type::{ATTACK_EVENT_TYPE, AttackEventTypeRule};
pub use exec::{DEFAULT_EXEC_THRESHOLD, ExecCounter, MANY_EXEC, ManyExecRule};

use std::borrow::Borrow;

use canarywatch_core::config::{DEFAULT_CANARY_MARKER, RulesConfig};
use canarywatch_core::event::Event;
use canarywatch_core::metrics as cw_metrics;
use canarywatch_core::pipeline::DetectionRule;
use canarywatch_core::types::Alert;
use metrics::counter;
use tracing::debug;

/// 규칙 엔진 -- 순서 있는 규칙 집합의 코디네이터
///
/// # 사용 예시
/// ```
/// use canarywatch_core::event::EventNormalizer;
/// use canarywatch_pipeline::rule::RuleEngine;
///
/// let event = EventNormalizer::default()
///     .normalize(serde_json::json!({"event_type": "file_write", "filename": "canary/doc1.txt"}))
///     .unwrap();
///
/// let mut engine = RuleEngine::with_defaults();
/// let alerts = engine.apply_rules([event]);
/// assert_eq!(alerts.len(), 1);
/// assert_eq!(alerts[0].rule, "WRITE_CANARY");
/// ```
pub struct RuleEngine {
    rules: Vec<Box<dyn DetectionRule>>,
}

impl RuleEngine {
    /// 규칙이 없는 엔진을 생성합니다.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// 기본 규칙 세트로 엔진을 생성합니다.
    pub fn with_defaults() -> Self {
        Self::new()
            .with_rule(CanaryAccessRule::write_canary(DEFAULT_CANARY_MARKER))
            .with_rule(CanaryAccessRule::suspicious_delete(DEFAULT_CANARY_MARKER))
            .with_rule(ManyExecRule::new(DEFAULT_EXEC_THRESHOLD))
    }

    /// 설정에서 규칙 세트를 구성합니다.
    pub fn from_config(config: &RulesConfig) -> Self {
        let mut engine = Self::new()
            .with_rule(CanaryAccessRule::write_canary(&config.canary_marker))
            .with_rule(CanaryAccessRule::suspicious_delete(&config.canary_marker))
            .with_rule(ManyExecRule::new(config.many_exec_threshold));

        if !config.attack_event_types.is_empty() {
            engine.add_rule(AttackEventTypeRule::new(
                config.attack_event_types.iter().cloned(),
            ));
        }

        engine
    }

    /// 규칙을 추가한 엔진을 반환합니다.
    pub fn with_rule(mut self, rule: impl DetectionRule + 'static) -> Self {
        self.add_rule(rule);
        self
    }

    /// 규칙을 목록 끝에 추가합니다.
    pub fn add_rule(&mut self, rule: impl DetectionRule + 'static) {
        self.rules.push(Box::new(rule));
    }

    /// 활성 규칙 ID 목록 (평가 순서)
    pub fn rule_ids(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.id()).collect()
    }

    /// 현재 규칙 수
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// 이벤트 배치 전체에 모든 규칙을 적용합니다.
    ///
    /// 호출이 끝나면 모든 상태 규칙이 `finalize`로 초기화되므로
    /// 호출 사이에 상태가 이어지지 않습니다.
    pub fn apply_rules<I>(&mut self, events: I) -> Vec<Alert>
    where
        I: IntoIterator,
        I::Item: Borrow<Event>,
    {
        let mut alerts = Vec::new();
        let mut observed = 0u64;

        for event in events {
            let event = event.borrow();
            observed += 1;
            for rule in &mut self.rules {
                alerts.extend(rule.evaluate(event));
            }
        }

        for rule in &mut self.rules {
            alerts.extend(rule.finalize());
        }

        for alert in &alerts {
            counter!(
                cw_metrics::RULES_ALERTS_TOTAL,
                cw_metrics::LABEL_RULE => alert.rule.clone(),
                cw_metrics::LABEL_SEVERITY => alert.severity.as_str()
            )
            .increment(1);
        }

        debug!(events = observed, alerts = alerts.len(), "rules applied");
        alerts
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// 기본 규칙 세트로 이벤트 배치를 평가합니다.
pub fn apply_rules<I>(events: I) -> Vec<Alert>
where
    I: IntoIterator,
    I::Item: Borrow<Event>,
{
    RuleEngine::with_defaults().apply_rules(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use canarywatch_core::event::EventNormalizer;
    use canarywatch_core::types::Severity;
    use serde_json::{Value, json};

    fn events(values: Vec<Value>) -> Vec<Event> {
        let normalizer = EventNormalizer::default();
        values
            .into_iter()
            .map(|v| normalizer.normalize(v).unwrap())
            .collect()
    }

    #[test]
    fn default_rule_ids_in_order() {
        let engine = RuleEngine::with_defaults();
        assert_eq!(
            engine.rule_ids(),
            vec![WRITE_CANARY, SUSPICIOUS_DELETE, MANY_EXEC]
        );
    }

    #[test]
    fn attack_type_rule_only_when_configured() {
        let config = RulesConfig::default();
        assert_eq!(RuleEngine::from_config(&config).rule_count(), 3);

        let config = RulesConfig {
            attack_event_types: vec!["file_encrypt".to_owned()],
            ..RulesConfig::default()
        };
        let engine = RuleEngine::from_config(&config);
        assert_eq!(engine.rule_ids().last(), Some(&ATTACK_EVENT_TYPE));
    }

    #[test]
    fn per_event_alerts_precede_aggregates() {
        let mut batch: Vec<Value> = (0..21)
            .map(|_| json!({"event_type": "execve", "pid": 12}))
            .collect();
        batch.insert(3, json!({"event_type": "file_write", "filename": "canary/a"}));
        batch.push(json!({"event_type": "file_delete", "filename": "canary/b"}));

        let alerts = apply_rules(events(batch));
        let rules: Vec<_> = alerts.iter().map(|a| a.rule.as_str()).collect();
        assert_eq!(rules, vec![WRITE_CANARY, SUSPICIOUS_DELETE, MANY_EXEC]);
        assert_eq!(alerts[2].severity, Severity::Medium);
    }

    #[test]
    fn state_does_not_carry_between_calls() {
        let mut engine = RuleEngine::with_defaults();
        let half: Vec<Value> = (0..15)
            .map(|_| json!({"event_type": "execve", "pid": 5}))
            .collect();

        assert!(engine.apply_rules(events(half.clone())).is_empty());
        assert!(engine.apply_rules(events(half)).is_empty());
    }

    #[test]
    fn one_event_can_trigger_several_rules() {
        let config = RulesConfig {
            attack_event_types: vec!["file_write".to_owned()],
            ..RulesConfig::default()
        };
        let mut engine = RuleEngine::from_config(&config);
        let alerts =
            engine.apply_rules(&events(vec![json!({"event_type": "file_write", "path": "canary/z"})]));
        assert_eq!(alerts.len(), 2);
    }

    #[test]
    fn configured_marker_and_threshold_apply() {
        let config = RulesConfig {
            canary_marker: "decoy".to_owned(),
            many_exec_threshold: 2,
            ..RulesConfig::default()
        };
        let mut engine = RuleEngine::from_config(&config);
        let alerts = engine.apply_rules(events(vec![
            json!({"event_type": "file_write", "filename": "canary/a"}),
            json!({"event_type": "file_write", "filename": "DECOY.txt"}),
            json!({"event_type": "exec", "pid": 1}),
            json!({"event_type": "exec", "pid": 1}),
            json!({"event_type": "exec", "pid": 1}),
        ]));
        let rules: Vec<_> = alerts.iter().map(|a| a.rule.as_str()).collect();
        assert_eq!(rules, vec![WRITE_CANARY, MANY_EXEC]);
    }

    #[test]
    fn empty_batch_yields_nothing() {
        assert!(apply_rules(Vec::<Event>::new()).is_empty());
    }
}
