//! 출력 싱크 -- 탐지 결과 JSONL, 알림 JSON 배열, 평가 보고서 JSON 객체
//!
//! JSONL 출력은 단일 writer 태스크([`DetectionSink::spawn`])만 기록하므로
//! 동시 스코어링 중에도 라인이 섞이지 않습니다.

use std::path::{Path, PathBuf};

use canarywatch_core::types::{Alert, Detection};
use serde::Serialize;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::PipelineError;

/// 탐지 결과 JSONL 기록기
pub struct DetectionSink {
    path: PathBuf,
    writer: BufWriter<File>,
    written: u64,
}

impl DetectionSink {
    /// 출력 파일을 생성합니다 (기존 파일은 덮어씁니다).
    pub async fn create(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)
            .await
            .map_err(|e| sink_error(&path, e))?;

        Ok(Self {
            path,
            writer: BufWriter::new(file),
            written: 0,
        })
    }

    /// 출력 파일 경로
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 탐지 결과 하나를 한 줄로 기록합니다.
    pub async fn write(&mut self, detection: &Detection) -> Result<(), PipelineError> {
        let mut line = serde_json::to_vec(detection)?;
        line.push(b'\n');
        self.writer
            .write_all(&line)
            .await
            .map_err(|e| sink_error(&self.path, e))?;
        self.written += 1;
        Ok(())
    }

    /// 버퍼를 비우고 기록한 라인 수를 반환합니다.
    pub async fn finish(mut self) -> Result<u64, PipelineError> {
        self.writer
            .flush()
            .await
            .map_err(|e| sink_error(&self.path, e))?;
        info!(path = %self.path.display(), detections = self.written, "detections written");
        Ok(self.written)
    }

    /// 채널이 닫힐 때까지 수신한 탐지 결과를 기록하는 writer 태스크를 시작합니다.
    pub fn spawn(
        mut self,
        mut rx: mpsc::Receiver<Detection>,
    ) -> JoinHandle<Result<u64, PipelineError>> {
        tokio::spawn(async move {
            while let Some(detection) = rx.recv().await {
                self.write(&detection).await?;
            }
            debug!(path = %self.path.display(), "detection channel closed");
            self.finish().await
        })
    }
}

/// 알림 목록을 pretty JSON 배열로 기록합니다.
pub async fn write_alerts(path: impl AsRef<Path>, alerts: &[Alert]) -> Result<(), PipelineError> {
    write_pretty(path.as_ref(), &alerts).await?;
    info!(path = %path.as_ref().display(), alerts = alerts.len(), "alerts written");
    Ok(())
}

/// 보고서 객체를 pretty JSON으로 기록합니다.
pub async fn write_report<T: Serialize>(
    path: impl AsRef<Path>,
    report: &T,
) -> Result<(), PipelineError> {
    write_pretty(path.as_ref(), report).await?;
    info!(path = %path.as_ref().display(), "report written");
    Ok(())
}

async fn write_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), PipelineError> {
    let mut body = serde_json::to_vec_pretty(value)?;
    body.push(b'\n');
    tokio::fs::write(path, body)
        .await
        .map_err(|e| sink_error(path, e))
}

fn sink_error(path: &Path, err: std::io::Error) -> PipelineError {
    PipelineError::Sink {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}
