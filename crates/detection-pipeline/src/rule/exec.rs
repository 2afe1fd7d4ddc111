//! 프로세스별 실행 횟수 규칙 (`MANY_EXEC`)
//!
//! 배치 전체를 관찰한 뒤에만 판정할 수 있는 유일한 상태 규칙입니다.
//! 배치를 여러 샤드로 나눠 처리할 때는 각 샤드의 [`ExecCounter`]를
//! [`ExecCounter::merge`]로 합친 뒤 임계값을 적용해야 합니다.

use std::collections::BTreeMap;

use canarywatch_core::config::DEFAULT_MANY_EXEC_THRESHOLD;
use canarywatch_core::event::Event;
use canarywatch_core::pipeline::DetectionRule;
use canarywatch_core::types::{Alert, Severity};
use serde_json::json;

/// 과다 실행 규칙 ID
pub const MANY_EXEC: &str = "MANY_EXEC";

/// 기본 임계값 (이 값을 초과해야 알림)
pub const DEFAULT_EXEC_THRESHOLD: u64 = DEFAULT_MANY_EXEC_THRESHOLD;

/// pid별 실행 이벤트 카운터
///
/// `BTreeMap`이므로 순회 순서가 pid 오름차순으로 고정됩니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecCounter {
    counts: BTreeMap<i64, u64>,
}

impl ExecCounter {
    /// 빈 카운터를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 실행 계열 이벤트이고 pid가 있으면 카운트를 올립니다.
    pub fn observe(&mut self, event: &Event) {
        if !event.is_exec() {
            return;
        }
        if let Some(pid) = event.pid {
            *self.counts.entry(pid).or_insert(0) += 1;
        }
    }

    /// 다른 샤드의 카운트를 합산합니다.
    pub fn merge(&mut self, other: ExecCounter) {
        for (pid, count) in other.counts {
            *self.counts.entry(pid).or_insert(0) += count;
        }
    }

    /// pid의 현재 카운트
    pub fn count(&self, pid: i64) -> u64 {
        self.counts.get(&pid).copied().unwrap_or(0)
    }

    /// 임계값을 초과한 `(pid, count)` 목록 (pid 오름차순)
    pub fn over_threshold(&self, threshold: u64) -> Vec<(i64, u64)> {
        self.counts
            .iter()
            .filter(|&(_, &count)| count > threshold)
            .map(|(&pid, &count)| (pid, count))
            .collect()
    }

    /// 카운터를 비웁니다.
    pub fn clear(&mut self) {
        self.counts.clear();
    }
}

/// 배치 내 pid별 실행 횟수가 임계값을 넘으면 집계 알림을 생성합니다.
#[derive(Debug, Clone)]
pub struct ManyExecRule {
    threshold: u64,
    counter: ExecCounter,
}

impl ManyExecRule {
    /// 임계값으로 규칙을 생성합니다.
    pub fn new(threshold: u64) -> Self {
        Self {
            threshold,
            counter: ExecCounter::new(),
        }
    }

    /// 샤드에서 수집한 카운트를 합칩니다.
    pub fn absorb(&mut self, shard: ExecCounter) {
        self.counter.merge(shard);
    }

    /// 누적된 카운터
    pub fn counter(&self) -> &ExecCounter {
        &self.counter
    }
}

impl Default for ManyExecRule {
    fn default() -> Self {
        Self::new(DEFAULT_EXEC_THRESHOLD)
    }
}

impl DetectionRule for ManyExecRule {
    fn id(&self) -> &str {
        MANY_EXEC
    }

    fn evaluate(&mut self, event: &Event) -> Vec<Alert> {
        self.counter.observe(event);
        Vec::new()
    }

    fn finalize(&mut self) -> Vec<Alert> {
        let alerts = self
            .counter
            .over_threshold(self.threshold)
            .into_iter()
            .map(|(pid, exec_count)| Alert {
                timestamp: None,
                rule: MANY_EXEC.to_owned(),
                severity: Severity::Medium,
                description: format!(
                    "pid {} executed {} processes (threshold {})",
                    pid, exec_count, self.threshold
                ),
                evidence: json!({ "pid": pid, "exec_count": exec_count }),
            })
            .collect();

        self.counter.clear();
        alerts
    }
}
