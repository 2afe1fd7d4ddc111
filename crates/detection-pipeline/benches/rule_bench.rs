//! 규칙 엔진 벤치마크
//!
//! 배치 크기별 규칙 적용 성능과 이벤트 정규화 비용을 측정합니다.

use canarywatch_core::event::{Event, EventNormalizer};
use canarywatch_pipeline::rule::{ExecCounter, RuleEngine};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use serde_json::{Value, json};

fn create_record(i: usize) -> Value {
    let filename = if i % 40 == 0 {
        "/home/user/canary/ledger.xlsx"
    } else {
        "/tmp/build.log"
    };

    match i % 4 {
        0 => json!({
            "event_id": format!("evt-{}", i),
            "timestamp": "2025-12-08T12:00:00Z",
            "event_type": "file_write",
            "pid": 1000 + (i % 16),
            "filename": filename,
        }),
        1 => json!({
            "id": format!("evt-{}", i),
            "time": "2025-12-08T12:00:01Z",
            "type": "execve",
            "pid": 1000 + (i % 16),
        }),
        2 => json!({
            "eventId": format!("evt-{}", i),
            "event_type": "file_read",
            "path": "/etc/passwd",
        }),
        _ => json!({
            "event_id": format!("evt-{}", i),
            "event_type": "file_delete",
            "filename": "/var/tmp/cache.bin",
            "label": "normal",
        }),
    }
}

fn create_batch(size: usize) -> Vec<Event> {
    let normalizer = EventNormalizer::default();
    (0..size)
        .filter_map(|i| normalizer.normalize(create_record(i)).ok())
        .collect()
}

fn bench_apply_rules_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_rules");

    for size in [100usize, 1_000, 10_000] {
        let batch = create_batch(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &batch, |b, batch| {
            let mut engine = RuleEngine::with_defaults();
            b.iter(|| black_box(engine.apply_rules(black_box(batch))));
        });
    }

    group.finish();
}

fn bench_normalize(c: &mut Criterion) {
    let normalizer = EventNormalizer::default();
    let records: Vec<Value> = (0..4).map(create_record).collect();

    let mut group = c.benchmark_group("normalize");
    group.throughput(Throughput::Elements(records.len() as u64));
    group.bench_function("alias_resolution", |b| {
        b.iter(|| {
            for record in &records {
                black_box(normalizer.normalize(black_box(record.clone())).ok());
            }
        });
    });
    group.finish();
}

fn bench_exec_counter_merge(c: &mut Criterion) {
    let batch = create_batch(10_000);
    let shards: Vec<ExecCounter> = batch
        .chunks(1_000)
        .map(|chunk| {
            let mut counter = ExecCounter::new();
            for event in chunk {
                counter.observe(event);
            }
            counter
        })
        .collect();

    let mut group = c.benchmark_group("exec_counter");
    group.bench_function("merge_10_shards", |b| {
        b.iter(|| {
            let mut total = ExecCounter::new();
            for shard in &shards {
                total.merge(shard.clone());
            }
            black_box(total.over_threshold(20))
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_apply_rules_scaling,
    bench_normalize,
    bench_exec_counter_merge
);
criterion_main!(benches);
