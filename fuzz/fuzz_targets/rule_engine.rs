#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use serde_json::json;

use canarywatch_core::event::EventNormalizer;
use canarywatch_pipeline::rule::RuleEngine;

/// 퍼저용 구조적 이벤트
#[derive(Arbitrary, Debug)]
struct FuzzEvent {
    kind: FuzzKind,
    pid: Option<i64>,
    filename: Option<String>,
}

#[derive(Arbitrary, Debug)]
enum FuzzKind {
    FileWrite,
    FileDelete,
    Execve,
    Exec,
    Other(String),
}

impl FuzzKind {
    fn as_str(&self) -> &str {
        match self {
            FuzzKind::FileWrite => "file_write",
            FuzzKind::FileDelete => "file_delete",
            FuzzKind::Execve => "execve",
            FuzzKind::Exec => "exec",
            FuzzKind::Other(s) => s,
        }
    }
}

fuzz_target!(|input: (u8, Vec<FuzzEvent>)| {
    let (threshold, events) = input;
    let normalizer = EventNormalizer::default();

    // 배치 크기 제한 (성능)
    let events: Vec<_> = events
        .iter()
        .take(256)
        .filter_map(|e| {
            normalizer
                .normalize(json!({
                    "event_type": e.kind.as_str(),
                    "pid": e.pid,
                    "filename": e.filename,
                }))
                .ok()
        })
        .collect();

    let mut config = canarywatch_core::config::RulesConfig::default();
    config.many_exec_threshold = u64::from(threshold.max(1));
    let mut engine = RuleEngine::from_config(&config);

    let first = engine.apply_rules(&events);
    // finalize 후 상태가 초기화되므로 같은 배치는 같은 결과를 내야 함
    let second = engine.apply_rules(&events);
    assert_eq!(first, second);
});
