//! 수집 오케스트레이션 -- 이벤트 읽기, 스코어링, JSONL 기록의 전체 흐름
//!
//! # 내부 아키텍처
//! ```text
//! EventReader -> Semaphore(concurrency) -> Scorer tasks -> mpsc -> DetectionSink writer
//! ```
//!
//! `concurrency = 1`이면 이벤트는 한 번에 하나씩 스코어링되고 출력 순서가
//! 입력 순서와 같습니다. 그보다 크면 출력 순서는 보장되지 않지만 모든
//! 탐지 결과는 자신의 `event_id`를 가집니다.

use std::path::Path;
use std::sync::Arc;

use canarywatch_core::event::EventNormalizer;
use canarywatch_core::pipeline::Scorer;
use serde::Serialize;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::reader::EventReader;
use crate::sink::DetectionSink;

/// 기본 writer 채널 용량
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// 한 번의 수집 실행 통계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    /// 읽은 이벤트 수
    pub events_read: u64,
    /// 기록한 탐지 결과 수
    pub detections_written: u64,
    /// `error:` 점수로 끝난 스코어링 수
    pub scoring_errors: u64,
    /// 객체가 아니어서 건너뛴 레코드 수
    pub skipped_records: u64,
    /// 파싱 실패로 건너뛴 라인 수
    pub malformed_lines: u64,
}

/// 수집 파이프라인
///
/// # 사용 예시
/// ```ignore
/// let scorer = ScoringClient::from_config(&config.scoring)?;
/// let pipeline = IngestPipeline::new(scorer).with_concurrency(4);
/// let stats = pipeline
///     .run_files("events.jsonl", "detections.jsonl", EventNormalizer::default())
///     .await?;
/// ```
pub struct IngestPipeline<S> {
    scorer: Arc<S>,
    concurrency: usize,
    channel_capacity: usize,
}

impl<S: Scorer + 'static> IngestPipeline<S> {
    /// 순차 처리(`concurrency = 1`) 파이프라인을 생성합니다.
    pub fn new(scorer: S) -> Self {
        Self {
            scorer: Arc::new(scorer),
            concurrency: 1,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// 동시 스코어링 요청 수를 설정합니다 (최소 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// writer 채널 용량을 설정합니다 (최소 1).
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// 동시 스코어링 요청 수
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// 입력 파일을 스코어링하여 출력 파일에 기록합니다.
    ///
    /// 입력 파일이 없으면 출력 파일을 만들기 전에 실패합니다.
    pub async fn run_files(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
        normalizer: EventNormalizer,
    ) -> Result<IngestStats, PipelineError> {
        let events = EventReader::open(input, normalizer).await?;
        let sink = DetectionSink::create(output).await?;
        self.run(events, sink).await
    }

    /// 이벤트 스트림 전체를 스코어링하여 싱크에 기록합니다.
    pub async fn run(
        &self,
        mut events: EventReader,
        sink: DetectionSink,
    ) -> Result<IngestStats, PipelineError> {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let writer = sink.spawn(rx);
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();
        let mut stats = IngestStats::default();

        info!(concurrency = self.concurrency, "ingestion started");

        for event in events.by_ref() {
            // 이전 요청이 끝나 permit이 반환될 때까지 대기합니다.
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| PipelineError::Channel(e.to_string()))?;

            // writer가 죽었으면 남은 이벤트는 스코어링하지 않습니다.
            if tx.is_closed() {
                warn!(
                    events_read = stats.events_read,
                    "detection writer stopped, abandoning remaining events"
                );
                break;
            }
            stats.events_read += 1;
            let scorer = Arc::clone(&self.scorer);
            let tx = tx.clone();

            tasks.spawn(async move {
                let detection = scorer.score(&event).await;
                let failed = detection.is_error();
                // 전송까지 끝낸 뒤 permit을 놓아야 순차 모드의 순서가 유지됩니다.
                let sent = tx.send(detection).await.is_ok();
                drop(permit);
                (failed, sent)
            });

            while let Some(joined) = tasks.try_join_next() {
                tally(&mut stats, joined)?;
            }
        }

        drop(tx);
        while let Some(joined) = tasks.join_next().await {
            tally(&mut stats, joined)?;
        }

        stats.detections_written = writer
            .await
            .map_err(|e| PipelineError::Channel(format!("writer task failed: {}", e)))??;
        stats.skipped_records = events.skipped_records() as u64;
        stats.malformed_lines = events.malformed_lines() as u64;

        info!(
            events = stats.events_read,
            detections = stats.detections_written,
            scoring_errors = stats.scoring_errors,
            skipped = stats.skipped_records,
            malformed = stats.malformed_lines,
            "ingestion complete"
        );
        Ok(stats)
    }
}

fn tally(
    stats: &mut IngestStats,
    joined: Result<(bool, bool), tokio::task::JoinError>,
) -> Result<(), PipelineError> {
    let (failed, sent) =
        joined.map_err(|e| PipelineError::Channel(format!("scoring task failed: {}", e)))?;
    if failed {
        stats.scoring_errors += 1;
    }
    if !sent {
        warn!("detection dropped: writer channel closed");
    }
    Ok(())
}
